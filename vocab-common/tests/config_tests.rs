//! Config file resolution and loading tests
//!
//! Tests touching `VOCAB_CURATOR_CONFIG` run serially.

use serial_test::serial;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vocab_common::config::{
    load_config, load_toml_config, resolve_config_path, write_toml_config, TomlConfig,
    CONFIG_ENV_VAR,
};
use vocab_common::{ArrayMatchMode, Error};

#[test]
#[serial]
fn cli_path_beats_environment() {
    std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(Some(Path::new("/from/cli.toml")));
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));
}

#[test]
#[serial]
fn environment_used_without_cli() {
    std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(None);
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));
}

#[test]
#[serial]
fn missing_explicit_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config = load_config(Some(path.as_path())).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn malformed_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[engine\nmax_matches = ").unwrap();

    assert!(matches!(load_config(Some(path.as_path())), Err(Error::Config(_))));
}

#[test]
fn write_then_load_preserves_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = TomlConfig::default();
    config.server.bind = "0.0.0.0:9000".to_string();
    config.engine.array_mode = ArrayMatchMode::EachElement;
    config.policy.accept_threshold = 0.9;
    config.columns.skip = vec!["notes".to_string()];

    write_toml_config(&config, &path).unwrap();
    assert!(path.exists());
    assert!(!dir.path().join("nested").join("config.toml.tmp").exists());

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn file_sections_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[logging]
level = "debug"

[database]
path = "/var/lib/curation.db"

[policy]
escalate_threshold = 0.4
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.database.path, PathBuf::from("/var/lib/curation.db"));
    assert_eq!(config.policy.escalate_threshold, 0.4);
    assert_eq!(config.policy.accept_threshold, 0.8);
    assert_eq!(config.server.bind, "127.0.0.1:5740");
}
