//! Tests for layered server configuration.

use std::io::Write;
use tempfile::NamedTempFile;
use tictactoe_rooms::ServerConfig;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn test_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.host(), "0.0.0.0");
    assert_eq!(*config.port(), 3000);
    assert_eq!(config.log_filter(), "info");
    assert_eq!(config.bind_address(), "0.0.0.0:3000");
}

#[test]
fn test_from_file_keeps_missing_defaults() {
    let file = write_config("port = 8080\n");
    let config = ServerConfig::from_file(file.path()).unwrap();
    assert_eq!(*config.port(), 8080);
    assert_eq!(config.host(), "0.0.0.0");
    assert_eq!(config.log_filter(), "info");
}

#[test]
fn test_from_file_full() {
    let file = write_config(
        r#"
host = "127.0.0.1"
port = 4100
log_filter = "tictactoe_rooms=debug"
"#,
    );
    let config = ServerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.bind_address(), "127.0.0.1:4100");
    assert_eq!(config.log_filter(), "tictactoe_rooms=debug");
}

#[test]
fn test_from_file_errors() {
    let missing = ServerConfig::from_file("/definitely/not/here.toml").unwrap_err();
    assert!(missing.message.contains("Failed to read config file"));

    let file = write_config("port = \"eighty\"\n");
    let invalid = ServerConfig::from_file(file.path()).unwrap_err();
    assert!(invalid.message.contains("Failed to parse config"));
}

#[test]
fn test_env_overrides() {
    let config = ServerConfig::default()
        .with_env_from(|key| match key {
            "HOST" => Some("127.0.0.1".to_string()),
            "PORT" => Some(" 9001 ".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.bind_address(), "127.0.0.1:9001");

    let unchanged = ServerConfig::default().with_env_from(no_env).unwrap();
    assert_eq!(unchanged, ServerConfig::default());
}

#[test]
fn test_blank_host_env_is_ignored() {
    let config = ServerConfig::default()
        .with_env_from(|key| (key == "HOST").then(|| "  ".to_string()))
        .unwrap();
    assert_eq!(config.host(), "0.0.0.0");
}

#[test]
fn test_invalid_port_env_is_an_error() {
    let err = ServerConfig::default()
        .with_env_from(|key| (key == "PORT").then(|| "http".to_string()))
        .unwrap_err();
    assert!(err.message.contains("Invalid PORT 'http'"));
    assert!(err.to_string().starts_with("Config error:"));
}

#[test]
fn test_flag_overrides_win() {
    let file = write_config("host = \"10.0.0.5\"\nport = 4000\n");
    let config = ServerConfig::from_file(file.path())
        .unwrap()
        .with_env_from(|key| (key == "PORT").then(|| "5000".to_string()))
        .unwrap()
        .with_host(None)
        .with_port(Some(6000));
    assert_eq!(config.bind_address(), "10.0.0.5:6000");
}
