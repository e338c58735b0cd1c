//! Unit tests for configuration loading and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate MEMBERS_ROOT_FOLDER are marked with #[serial].

use members_common::config::{
    database_path, resolve_root_folder, ConfigSource, TomlConfig, DEFAULT_CLEAN_THRESHOLD_DAYS,
    DEFAULT_SWEEP_CHUNK_SIZE, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Log sink shared with a test subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn capture_logs(f: impl FnOnce()) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    logs.contents()
}

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert_eq!(config.log_level, "info");
    assert_eq!(config.port, 8000);
    assert_eq!(config.ingest_workers, 4);
    assert!(config.root_folder.is_none());
}

#[test]
fn test_parse_partial_file_keeps_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/members"
        event_message_clean_threshold = 14
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/members")));
    assert_eq!(config.event_message_clean_threshold, Some(14));
    assert_eq!(config.log_level, "info");
    assert_eq!(config.port, 8000);
}

#[test]
fn test_parse_invalid_file_is_config_error() {
    let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_load_missing_explicit_path_fails() {
    let result = TomlConfig::load(Some(Path::new("/nonexistent/members/config.toml")));
    assert!(result.is_err());
}

#[test]
fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 9100\nsweep_chunk_size = 250\n").unwrap();

    let (config, source) = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.port, 9100);
    assert_eq!(config.sweep_chunk_size(None), 250);
    assert_eq!(source, ConfigSource::File(path));
}

#[test]
fn test_load_is_silent_until_source_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "log_level = \"debug\"\n").unwrap();

    let mut loaded = None;
    let during_load = capture_logs(|| loaded = Some(TomlConfig::load(Some(&path)).unwrap()));
    assert!(during_load.is_empty(), "unexpected output: {}", during_load);

    let (config, source) = loaded.unwrap();
    assert_eq!(config.log_level, "debug");

    let reported = capture_logs(|| source.log());
    assert!(reported.contains("Loaded config file"), "got: {}", reported);
    assert!(reported.contains("config.toml"));
}

#[test]
fn test_defaults_source_logs_warning() {
    let reported = capture_logs(|| ConfigSource::Defaults.log());
    assert!(reported.contains("WARN"));
    assert!(reported.contains("No config file found"));
    assert_eq!(ConfigSource::Defaults.to_string(), "built-in defaults");
}

#[test]
fn test_threshold_precedence() {
    let mut config = TomlConfig::default();
    assert_eq!(config.clean_threshold_days(None), DEFAULT_CLEAN_THRESHOLD_DAYS);

    config.event_message_clean_threshold = Some(14);
    assert_eq!(config.clean_threshold_days(None), 14);

    // Per-invocation value wins over the config file
    assert_eq!(config.clean_threshold_days(Some(5)), 5);
}

#[test]
fn test_chunk_size_precedence() {
    let mut config = TomlConfig::default();
    assert_eq!(config.sweep_chunk_size(None), DEFAULT_SWEEP_CHUNK_SIZE);

    config.sweep_chunk_size = Some(50);
    assert_eq!(config.sweep_chunk_size(None), 50);
    assert_eq!(config.sweep_chunk_size(Some(10)), 10);
}

#[test]
#[serial]
fn test_resolver_cli_arg_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/members-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/members-config")),
        ..TomlConfig::default()
    };

    let root = resolve_root_folder(Some(Path::new("/tmp/members-cli")), &config);
    assert_eq!(root, PathBuf::from("/tmp/members-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_over_config() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/members-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/members-config")),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/tmp/members-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_config_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/members-config")),
        ..TomlConfig::default()
    };
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/tmp/members-config"));

    let fallback = resolve_root_folder(None, &TomlConfig::default());
    assert!(!fallback.as_os_str().is_empty());
    assert!(fallback.to_string_lossy().contains("members"));
}

#[test]
fn test_database_path() {
    let root = PathBuf::from("/tmp/members-root");
    assert_eq!(database_path(&root), root.join("members.db"));
}
