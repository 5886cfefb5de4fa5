//! Configuration Loading Integration Tests

use packethub::config::{Config, ConfigManager};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.server.bind_addr, "0.0.0.0:7200".parse().unwrap());
    assert_eq!(config.server.backlog, 50);
    assert_eq!(config.server.recv_buffer_size, 4096);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("packethub.toml");
    fs::write(&config_path, create_test_config("127.0.0.1:9100", 10, 2048)).unwrap();

    let config = ConfigManager::load_from_file(&config_path).unwrap();

    assert_eq!(config.server.bind_addr, "127.0.0.1:9100".parse().unwrap());
    assert_eq!(config.server.backlog, 10);
    assert_eq!(config.server.recv_buffer_size, 2048);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("does_not_exist.toml");

    let config = ConfigManager::load_from_file(&config_path).unwrap();

    assert_eq!(config.server.bind_addr, "0.0.0.0:7200".parse().unwrap());
    assert_eq!(config.server.backlog, 50);
}

#[test]
fn test_invalid_toml_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("packethub.toml");
    fs::write(&config_path, "invalid toml content [[[").unwrap();

    assert!(ConfigManager::load_from_file(&config_path).is_err());
}

#[test]
fn test_validation_rejects_zero_backlog() {
    let mut config = Config::default();
    config.server.backlog = 0;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("backlog"));
}

#[test]
fn test_validation_rejects_bad_buffer_sizes() {
    let mut config = Config::default();
    config.server.recv_buffer_size = 0;
    assert!(config.validate().is_err());

    config.server.recv_buffer_size = 2 * 1024 * 1024;
    assert!(config.validate().is_err());

    config.server.recv_buffer_size = 4096;
    assert!(config.validate().is_ok());
}

// Environment overrides share process-global state, so this stays one test
#[test]
fn test_load_from_env() {
    std::env::set_var("PACKETHUB_BIND_ADDR", "127.0.0.1:9200");
    std::env::set_var("PACKETHUB_BACKLOG", "25");
    std::env::set_var("PACKETHUB_RECV_BUFFER_SIZE", "1024");

    let config = ConfigManager::load_from_env().unwrap();
    assert_eq!(config.server.bind_addr, "127.0.0.1:9200".parse().unwrap());
    assert_eq!(config.server.backlog, 25);
    assert_eq!(config.server.recv_buffer_size, 1024);

    std::env::set_var("PACKETHUB_BIND_ADDR", "not-an-address");
    assert!(ConfigManager::load_from_env().is_err());

    std::env::remove_var("PACKETHUB_BIND_ADDR");
    std::env::remove_var("PACKETHUB_BACKLOG");
    std::env::remove_var("PACKETHUB_RECV_BUFFER_SIZE");
}

fn create_test_config(bind_addr: &str, backlog: u32, recv_buffer_size: usize) -> String {
    format!(
        r#"
[server]
bind_addr = "{}"
backlog = {}
recv_buffer_size = {}
"#,
        bind_addr, backlog, recv_buffer_size
    )
}
