use super::*;
use std::path::PathBuf;

fn temp_root(label: &str) -> PathBuf {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir().join(format!("cinema_storage_{label}_{suffix}"))
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn set_then_get_overwrites_previous_value() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.get_value("token").await.expect("read"), None);

    storage.set_values(&[("token", "first")]).await.expect("write");
    storage.set_values(&[("token", "second")]).await.expect("overwrite");

    assert_eq!(
        storage.get_value("token").await.expect("read").as_deref(),
        Some("second")
    );
}

#[tokio::test]
async fn remove_values_drops_only_listed_keys() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .set_values(&[("token", "abc"), ("user", "{}"), ("theme", "dark")])
        .await
        .expect("write");

    let removed = storage
        .remove_values(&["token", "user", "missing"])
        .await
        .expect("remove");

    assert_eq!(removed, 2);
    assert_eq!(storage.get_value("token").await.expect("read"), None);
    assert_eq!(storage.get_value("user").await.expect("read"), None);
    assert_eq!(
        storage.get_value("theme").await.expect("read").as_deref(),
        Some("dark")
    );
}

#[tokio::test]
async fn values_survive_reopening_file_database() {
    let root = temp_root("reopen");
    let db_path = root.join("nested").join("client.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage.set_values(&[("token", "persisted")]).await.expect("write");
        storage.pool.close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened.get_value("token").await.expect("read").as_deref(),
        Some("persisted")
    );
    assert!(db_path.exists(), "database file should exist");

    reopened.pool.close().await;
    std::fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn strips_bare_sqlite_scheme_and_backslashes() {
    assert_eq!(
        normalize_database_url(r"sqlite:data\client.db"),
        "sqlite://data/client.db"
    );
}

#[test]
fn empty_url_falls_back_to_default_location() {
    assert_eq!(normalize_database_url("  "), default_database_url());
}

#[test]
fn memory_url_has_no_parent_directory() {
    assert!(sqlite_file("sqlite::memory:").is_none());
    assert!(sqlite_file("postgres://localhost/cinema").is_none());
    assert_eq!(
        sqlite_file("sqlite://./data/x.db?mode=rwc"),
        Some(Path::new("./data/x.db"))
    );
}

#[test]
fn prepare_creates_parent_dir_for_file_url() {
    let root = temp_root("prepare");
    let db_path = root.join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(root.join("data").exists());

    std::fs::remove_dir_all(root).expect("cleanup");
}
