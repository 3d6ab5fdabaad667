//! Local filesystem store against a temporary directory

use chrono::{Duration as ChronoDuration, Utc};
use locksmith_rotation::store::{LocalSecretStore, LocalStoreConfig, SecretStore};
use locksmith_rotation::{ConfigError, RotationEngine, RotationPolicy, SecretValue, StoreError};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

fn setup_params(dir: &TempDir) -> HashMap<String, String> {
    HashMap::from([(
        "path".to_string(),
        dir.path().join("secrets").display().to_string(),
    )])
}

async fn configured_store(dir: &TempDir) -> LocalSecretStore {
    let mut store = LocalSecretStore::default();
    store.setup(&setup_params(dir)).await.unwrap();
    store
}

#[tokio::test]
async fn test_setup_creates_directory() {
    let dir = TempDir::new().unwrap();
    let store = configured_store(&dir).await;

    let path = dir.path().join("secrets");
    assert!(path.is_dir());
    assert_eq!(store.path(), Some(path.as_path()));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}

#[tokio::test]
async fn test_setup_rejects_relative_path() {
    let mut store = LocalSecretStore::default();
    let params = HashMap::from([("path".to_string(), "relative/secrets".to_string())]);
    let err = store.setup(&params).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn test_missing_directory_without_create_dir() {
    let dir = TempDir::new().unwrap();
    let config = LocalStoreConfig::new(dir.path().join("absent")).with_create_dir(false);
    let store = LocalSecretStore::new(config).unwrap();

    let err = store.get_all().await.unwrap_err();
    assert!(matches!(err, StoreError::WriteFailure { .. }));
}

#[tokio::test]
async fn test_store_and_read_back() {
    let dir = TempDir::new().unwrap();
    let store = configured_store(&dir).await;
    let t0 = Utc::now();

    let older = SecretValue::new(vec![1u8; 64]);
    let newer = SecretValue::new(vec![2u8; 64]);
    store.store("aaaaaaaaaaaa", &older, t0).await.unwrap();
    store
        .store("bbbbbbbbbbbb", &newer, t0 + ChronoDuration::minutes(5))
        .await
        .unwrap();

    let latest = store.get_latest().await.unwrap();
    assert_eq!(latest.id, "bbbbbbbbbbbb");
    assert_eq!(latest.value, newer);

    let fetched = store.get("aaaaaaaaaaaa").await.unwrap();
    assert_eq!(fetched.value, older);
    assert_eq!(fetched.created_at, t0);

    assert_eq!(store.get_all().await.unwrap().len(), 2);
    assert!(store.get("cccccccccccc").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_empty_store_has_no_latest() {
    let dir = TempDir::new().unwrap();
    let store = configured_store(&dir).await;
    assert!(matches!(store.get_latest().await, Err(StoreError::Empty)));
    assert!(store.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_overwrites_same_id() {
    let dir = TempDir::new().unwrap();
    let store = configured_store(&dir).await;
    let now = Utc::now();

    store
        .store("aaaaaaaaaaaa", &SecretValue::new(vec![1; 32]), now)
        .await
        .unwrap();
    store
        .store("aaaaaaaaaaaa", &SecretValue::new(vec![9; 32]), now)
        .await
        .unwrap();

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].value, SecretValue::new(vec![9; 32]));
}

#[tokio::test]
async fn test_record_file_format_and_permissions() {
    let dir = TempDir::new().unwrap();
    let store = configured_store(&dir).await;
    store
        .store("a1b2c3d4e5f6", &SecretValue::new(vec![0xff; 32]), Utc::now())
        .await
        .unwrap();

    let file = dir.path().join("secrets").join("a1b2c3d4e5f6.secret");
    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&file).unwrap()).unwrap();
    assert_eq!(json["version"], 1);
    assert_eq!(json["id"], "a1b2c3d4e5f6");
    assert!(json["value"].is_string());
    assert!(json["created_at"].is_string());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    // No temporary files left behind
    let entries = std::fs::read_dir(dir.path().join("secrets")).unwrap().count();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_rejects_path_traversal_ids() {
    let dir = TempDir::new().unwrap();
    let store = configured_store(&dir).await;
    let err = store
        .store("../escape", &SecretValue::new(vec![1; 32]), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidId { .. }));
}

#[tokio::test]
async fn test_corrupted_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let store = configured_store(&dir).await;
    store
        .store("aaaaaaaaaaaa", &SecretValue::new(vec![1; 32]), Utc::now())
        .await
        .unwrap();
    std::fs::write(dir.path().join("secrets").join("broken.secret"), b"{not json").unwrap();
    std::fs::write(dir.path().join("secrets").join("notes.txt"), b"ignored").unwrap();

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);

    let err = store.get("broken").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupted { .. }));
}

#[tokio::test]
async fn test_engine_restart_reloads_history() {
    let dir = TempDir::new().unwrap();
    let policy = RotationPolicy::default();

    let first_run = RotationEngine::new(Arc::new(configured_store(&dir).await), policy);
    first_run.initialize().await.unwrap();
    first_run.rotate().await.unwrap();
    let before = first_run.secrets();
    drop(first_run);

    let second_run = RotationEngine::new(Arc::new(configured_store(&dir).await), policy);
    second_run.initialize().await.unwrap();

    let ids = |secrets: &[locksmith_rotation::Secret]| -> Vec<String> {
        secrets.iter().map(|s| s.id.clone()).collect()
    };
    assert_eq!(ids(&second_run.secrets()), ids(&before));
    assert_eq!(
        second_run.export_active_hex(),
        before[0].value.to_hex()
    );
}
