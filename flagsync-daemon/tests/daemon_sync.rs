//! End-to-end daemon behavior over the in-process flag source.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use flagsync_core::config::Config;
use flagsync_daemon::Daemon;
use flagsync_source::MemorySource;

fn test_config(dir: &TempDir, flags: &str) -> Config {
    let env_file = dir.path().join(".env").display().to_string();
    let flags = flags.to_string();
    Config::from_vars(move |key| match key {
        "FLAGSYNC_SDK_KEY" => Some("sdk-test".to_string()),
        "FLAGSYNC_FLAGS" => Some(flags.clone()),
        "FLAGSYNC_ENV_FILE" => Some(env_file.clone()),
        "FLAGSYNC_BACKUP" => Some("false".to_string()),
        "FLAGSYNC_DEBOUNCE_MS" => Some("50".to_string()),
        _ => None,
    })
    .expect("config")
}

async fn wait_for_content(path: &Path, needle: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.contains(needle) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for '{needle}' in {path:?}; current content: {content:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn initial_sync_then_change_propagation_then_graceful_stop() {
    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir, "API_URL,APP_URL");
    let env_file = config.env_file.clone();

    let source = Arc::new(MemorySource::new());
    source.set("API_URL", "https://api.example.test");

    let (daemon, handle) = Daemon::new(config, source.clone());
    let daemon_task = tokio::spawn(daemon.run());

    // Initial sync: known key evaluated, unknown key at fallback.
    wait_for_content(&env_file, "API_URL=https://api.example.test").await;
    wait_for_content(&env_file, "APP_URL=").await;

    // A remote change propagates through watch → debounce → persist.
    source.set("API_URL", "https://api.v2.example.test");
    wait_for_content(&env_file, "API_URL=https://api.v2.example.test").await;

    handle.stop();
    handle.stop(); // idempotent

    tokio::time::timeout(Duration::from_secs(5), daemon_task)
        .await
        .expect("daemon must stop in time")
        .expect("join")
        .expect("daemon result");

    // The connection was closed during teardown.
    assert!(!flagsync_source::Connection::is_ready(source.as_ref()));
}

#[tokio::test(flavor = "multi_thread")]
async fn pre_existing_untracked_keys_survive_the_daemon() {
    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir, "API_URL");
    let env_file = config.env_file.clone();
    std::fs::write(&env_file, "KEEP=untouched\n").expect("seed");

    let source = Arc::new(MemorySource::new());
    source.set("API_URL", "v1");

    let (daemon, handle) = Daemon::new(config, source.clone());
    let daemon_task = tokio::spawn(daemon.run());

    wait_for_content(&env_file, "API_URL=v1").await;

    source.set("API_URL", "v2");
    wait_for_content(&env_file, "API_URL=v2").await;

    let content = std::fs::read_to_string(&env_file).expect("read");
    assert!(
        content.contains("KEEP=untouched"),
        "untracked key lost: {content:?}"
    );

    handle.stop();
    tokio::time::timeout(Duration::from_secs(5), daemon_task)
        .await
        .expect("daemon must stop in time")
        .expect("join")
        .expect("daemon result");
}

#[tokio::test(flavor = "multi_thread")]
async fn rapid_changes_coalesce_into_few_writes() {
    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir, "API_URL");
    let env_file = config.env_file.clone();

    let source = Arc::new(MemorySource::new());
    let (daemon, handle) = Daemon::new(config, source.clone());
    let daemon_task = tokio::spawn(daemon.run());

    wait_for_content(&env_file, "API_URL=").await;

    // Burst of updates inside one debounce window; only the last value
    // must land.
    for n in 0..10 {
        source.set("API_URL", &format!("v{n}"));
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    wait_for_content(&env_file, "API_URL=v9").await;

    handle.stop();
    tokio::time::timeout(Duration::from_secs(5), daemon_task)
        .await
        .expect("daemon must stop in time")
        .expect("join")
        .expect("daemon result");
}
