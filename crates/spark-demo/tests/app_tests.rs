use pretty_assertions::assert_eq;
use spark_demo::{AppConfig, DemoApp, DemoError, UserPanelState};
use spark_test_utils::{default_test_host, sample_user};
use std::time::Duration;

#[test]
fn missing_config_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, AppConfig::default());
}

#[test]
fn config_file_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spark.toml");
    std::fs::write(
        &path,
        "[kv]\nstore_path = \"data/notes.json\"\nhydration_timeout_ms = 1000\n",
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();

    assert_eq!(config.kv.store_path, std::path::PathBuf::from("data/notes.json"));
    assert_eq!(config.kv.accessor.hydration_timeout(), Duration::from_secs(1));
}

#[test]
fn config_renders_back_to_toml() {
    let config = AppConfig::new()
        .with_store_path("notes.json")
        .with_user(sample_user());

    let text = config.to_toml_string().unwrap();

    assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn bad_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spark.toml");
    std::fs::write(&path, "[kv]\nhydration_timeout_ms = \"soon\"\n").unwrap();

    assert!(matches!(AppConfig::load(&path), Err(DemoError::Config(_))));
}

#[tokio::test]
async fn notes_persist_across_app_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::new()
        .with_store_path(dir.path().join("kv.json"))
        .with_user(sample_user());

    let app = DemoApp::new(&config).unwrap();
    app.notes().ready().await;
    app.notes().add_note("Buy milk").unwrap();
    app.shutdown().await;

    let app = DemoApp::new(&config).unwrap();
    let notes = app.notes().ready().await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text, "Buy milk");

    assert!(matches!(
        app.user_panel().load().await,
        UserPanelState::Loaded(_)
    ));
    app.shutdown().await;
}

#[tokio::test]
async fn app_without_user_fails_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::new().with_store_path(dir.path().join("kv.json"));

    let app = DemoApp::new(&config).unwrap();

    assert_eq!(app.user_panel().load().await, UserPanelState::Failed);
    app.shutdown().await;
}

#[tokio::test]
async fn controllers_share_one_host() {
    let app = DemoApp::with_host(default_test_host(), "gpt-4o-mini").unwrap();

    let answer = app.playground().generate("ping").await.unwrap();
    app.notes().add_note(&answer).unwrap();

    assert_eq!(app.playground().model(), "gpt-4o-mini");
    assert_eq!(app.host().kv().active_keys(), vec!["spark-demo-notes".to_string()]);
    assert_eq!(app.toaster().toasts().len(), 2);
    app.shutdown().await;
}
