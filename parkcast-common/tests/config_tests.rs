//! Configuration resolution and graceful degradation tests
//!
//! Covers:
//! - Missing config files fall back to compiled defaults
//! - Priority order: CLI path → PARKCAST_CONFIG → platform default → compiled defaults
//! - PARKCAST_* path overrides
//!
//! Note: Uses serial_test to prevent environment variable race conditions.
//! Tests that touch PARKCAST_* variables are marked with #[serial].

use parkcast_common::config::{
    resolve_config_path, ParkcastConfig, BIND_ENV, CONFIG_ENV, METADATA_PATH_ENV, MODEL_PATH_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    for var in [CONFIG_ENV, METADATA_PATH_ENV, MODEL_PATH_ENV, BIND_ENV] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_missing_cli_config_uses_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let config = ParkcastConfig::load(Some(&missing)).unwrap();
    assert_eq!(config, ParkcastConfig::default());
}

#[test]
#[serial]
fn test_cli_path_is_loaded() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parkcast.toml");
    std::fs::write(
        &path,
        r#"
        [paths]
        metadata = "/data/coordinates.csv"

        [weather]
        latitude = 51.1
        page_url = "https://weather.example/dresden"
        "#,
    )
    .unwrap();

    let config = ParkcastConfig::load(Some(&path)).unwrap();
    assert_eq!(config.paths.metadata, PathBuf::from("/data/coordinates.csv"));
    assert_eq!(config.weather.latitude, 51.1);
    assert_eq!(
        config.weather.page_url.as_deref(),
        Some("https://weather.example/dresden")
    );
    // Untouched sections keep compiled defaults
    assert_eq!(config.sources.timeout_secs, 5);
}

#[test]
#[serial]
fn test_env_config_path_used_without_cli() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("from-env.toml");
    std::fs::write(&path, "[server]\nbind = \"0.0.0.0:9000\"\n").unwrap();
    env::set_var(CONFIG_ENV, &path);

    assert_eq!(resolve_config_path(None), Some(path.clone()));
    let config = ParkcastConfig::load(None).unwrap();
    assert_eq!(config.server.bind, "0.0.0.0:9000");

    clear_env();
}

#[test]
#[serial]
fn test_cli_path_takes_precedence_over_env() {
    clear_env();
    env::set_var(CONFIG_ENV, "/tmp/parkcast-env.toml");
    let cli = PathBuf::from("/tmp/parkcast-cli.toml");

    assert_eq!(resolve_config_path(Some(&cli)), Some(cli));

    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_paths_and_bind() {
    clear_env();
    env::set_var(METADATA_PATH_ENV, "/srv/meta.csv");
    env::set_var(MODEL_PATH_ENV, "/srv/model.json");
    env::set_var(BIND_ENV, "0.0.0.0:8080");

    let dir = TempDir::new().unwrap();
    let config = ParkcastConfig::load(Some(&dir.path().join("none.toml"))).unwrap();
    assert_eq!(config.paths.metadata, PathBuf::from("/srv/meta.csv"));
    assert_eq!(config.paths.model, PathBuf::from("/srv/model.json"));
    assert_eq!(config.server.bind, "0.0.0.0:8080");

    clear_env();
}

#[test]
#[serial]
fn test_malformed_config_is_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[sources\ntimeout_secs = ").unwrap();

    assert!(ParkcastConfig::load(Some(&path)).is_err());
}
