//! Configuration module for mini-mqttd.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Which acceptor drives the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    /// Single-threaded mio loop; one session at a time.
    #[default]
    Mio,
    /// Tokio runtime with one task per connection.
    Tokio,
}

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "mini-mqttd")]
#[command(author = "mini-mqttd authors")]
#[command(version = "0.1.0")]
#[command(about = "A minimal MQTT-style control-packet framing server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Listen backlog
    #[arg(short, long)]
    pub backlog: Option<i32>,

    /// Acceptor runtime
    #[arg(short, long, value_enum)]
    pub runtime: Option<RuntimeType>,

    /// Maximum concurrent connections (tokio runtime only)
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Bytes requested per read call
    #[arg(long)]
    pub read_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    #[serde(default)]
    pub runtime: RuntimeType,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_read_size")]
    pub read_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backlog: default_backlog(),
            runtime: RuntimeType::default(),
            max_connections: default_max_connections(),
            read_size: default_read_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_backlog() -> i32 {
    1
}

fn default_max_connections() -> usize {
    1024
}

fn default_read_size() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backlog: i32,
    pub runtime: RuntimeType,
    pub max_connections: usize,
    pub read_size: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(CliArgs::empty(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        let toml_config = match cli.config {
            Some(ref path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let server = toml_config.server;
        Config {
            host: cli.host.unwrap_or(server.host),
            port: cli.port.unwrap_or(server.port),
            backlog: cli.backlog.unwrap_or(server.backlog).max(1),
            runtime: cli.runtime.unwrap_or(server.runtime),
            max_connections: cli
                .max_connections
                .unwrap_or(server.max_connections)
                .max(1),
            read_size: cli.read_size.unwrap_or(server.read_size).max(1),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        }
    }

    /// `host:port` as given, for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl CliArgs {
    fn empty() -> Self {
        Self {
            config: None,
            host: None,
            port: None,
            backlog: None,
            runtime: None,
            max_connections: None,
            read_size: None,
            log_level: default_log_level(),
        }
    }
}

impl TomlConfig {
    fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.clone(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::TomlParse(path.clone(), e))
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4000);
        assert_eq!(config.backlog, 1);
        assert_eq!(config.runtime, RuntimeType::Mio);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.listen_addr(), "127.0.0.1:4000");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "0.0.0.0"
            port = 1883
            backlog = 16
            runtime = "tokio"
            max_connections = 8

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 1883);
        assert_eq!(config.server.backlog, 16);
        assert_eq!(config.server.runtime, RuntimeType::Tokio);
        assert_eq!(config.server.max_connections, 8);
        assert_eq!(config.server.read_size, 1024);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = CliArgs::parse_from([
            "mini-mqttd",
            "--port",
            "5000",
            "--runtime",
            "tokio",
            "--log-level",
            "trace",
        ]);
        let file: TomlConfig = toml::from_str(
            r#"
            [server]
            host = "10.0.0.1"
            port = 1883
            [logging]
            level = "warn"
        "#,
        )
        .unwrap();

        let config = Config::merge(cli, file);
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.runtime, RuntimeType::Tokio);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_zero_limits_are_clamped() {
        let cli = CliArgs::parse_from(["mini-mqttd", "--backlog", "0", "--read-size", "0"]);
        let config = Config::merge(cli, TomlConfig::default());
        assert_eq!(config.backlog, 1);
        assert_eq!(config.read_size, 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = TomlConfig::from_file(&PathBuf::from("/nonexistent/mini-mqttd.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(..)));
        assert!(err.to_string().contains("/nonexistent/mini-mqttd.toml"));
    }
}
