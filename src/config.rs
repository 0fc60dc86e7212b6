use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix, e.g. `UPCLOUD_PLUGIN_KEY`.
pub const ENV_PREFIX: &str = "UPCLOUD_";

/// Where engine entries are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,
    /// Shared token the host must present on every engine request.
    pub plugin_key: String,
    pub storage: StorageKind,
    pub database_url: String,
    pub mount_point: String,
    pub default_lease_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8210".to_string(),
            loglevel: "info".to_string(),
            plugin_key: String::new(),
            storage: StorageKind::Sqlite,
            database_url: "sqlite://upcloud-secrets.db".to_string(),
            mount_point: "upcloud/".to_string(),
            default_lease_ttl_secs: 3600,
        }
    }
}

impl Config {
    /// Defaults, then `config.toml` if present, then `UPCLOUD_*` variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_figment(Self::figment("config.toml"))
    }

    pub fn figment(toml_path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(toml_path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        let cfg: Config = figment.extract()?;
        if cfg.plugin_key.trim().is_empty() {
            return Err(figment::Error::from(format!(
                "{ENV_PREFIX}PLUGIN_KEY (plugin_key) must be set"
            )));
        }
        Ok(cfg)
    }

    pub fn default_lease_ttl(&self) -> Duration {
        Duration::from_secs(self.default_lease_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_require_plugin_key() {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        assert!(Config::from_figment(figment).is_err());
    }

    #[test]
    fn overrides_are_merged() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Serialized::default("plugin_key", "abc"))
            .merge(Serialized::default("storage", "memory"))
            .merge(Serialized::default("default_lease_ttl_secs", 60));
        let cfg = Config::from_figment(figment).unwrap();
        assert_eq!(cfg.plugin_key, "abc");
        assert_eq!(cfg.storage, StorageKind::Memory);
        assert_eq!(cfg.default_lease_ttl(), Duration::from_secs(60));
        assert_eq!(cfg.mount_point, "upcloud/");
    }

    #[test]
    fn env_variables_use_prefix() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("UPCLOUD_PLUGIN_KEY", "from-env");
            jail.set_env("UPCLOUD_LISTEN_ADDR", "0.0.0.0:9000");
            let cfg = Config::from_figment(Config::figment("missing.toml"))?;
            assert_eq!(cfg.plugin_key, "from-env");
            assert_eq!(cfg.listen_addr, "0.0.0.0:9000");
            Ok(())
        });
    }
}
