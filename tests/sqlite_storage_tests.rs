use std::{
    fs,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use upcloud_secrets::db::SqliteStorage;
use upcloud_secrets::logical::{BackendConfig, Operation};
use upcloud_secrets::upcloud::{UpcloudSubaccount, read_config};

#[tokio::test]
async fn config_survives_reopening_the_database() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "upcloud-secrets-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let database_url = format!("sqlite://{}", temp_path.display());

    {
        let storage = SqliteStorage::connect(&database_url)
            .await
            .expect("failed to open sqlite storage");
        let backend = upcloud_secrets::factory(BackendConfig {
            storage: Arc::new(storage.clone()),
            mount_point: "upcloud/".to_string(),
            default_lease_ttl: Duration::from_secs(60),
        })
        .expect("factory failed");

        let mut data = serde_json::Map::new();
        data.insert("username".into(), "admin".into());
        data.insert("password".into(), "s3cret".into());
        let req = backend
            .request(Operation::Create, "config")
            .with_client_token("root")
            .with_data(data);
        assert!(backend.handle_request(&req).await.unwrap().is_none());

        let req = backend
            .request(Operation::Update, "subaccount/ops")
            .with_client_token("root");
        assert!(backend.handle_request(&req).await.unwrap().is_none());

        storage.pool().close().await;
    }

    let storage = SqliteStorage::connect(&database_url)
        .await
        .expect("failed to reopen sqlite storage");

    let auth = read_config(&storage).await.unwrap().expect("config missing");
    assert_eq!(auth.username, "admin");
    assert_eq!(auth.password, "s3cret");

    let entry = upcloud_secrets::logical::Storage::get(&storage, "subaccount/ops")
        .await
        .unwrap()
        .expect("subaccount missing");
    let sub: UpcloudSubaccount = entry.decode_json().unwrap();
    assert_eq!(sub.username, "ops");

    storage.pool().close().await;
    let _ = fs::remove_file(&temp_path);
}
