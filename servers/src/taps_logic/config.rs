use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_DATABASE_URL: &str = "sqlite://kegtap.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_IMAGE_DIR: &str = "static/images";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CONFIG_FILE: &str = "server_taps.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Keg tap volume ledger server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "KEGTAP_PORT", help = "Port to listen on.")]
    pub port: Option<u16>,

    #[clap(long, env = "KEGTAP_BIND", help = "Address to bind to.")]
    pub bind_address: Option<String>,

    #[clap(long, env = "KEGTAP_DATABASE_URL", help = "SQLite database URL (e.g. sqlite://kegtap.db).")]
    pub database_url: Option<String>,

    #[clap(long, env = "KEGTAP_MAX_CONNECTIONS", help = "Maximum pooled database connections.")]
    pub max_connections: Option<u32>,

    #[clap(long, env = "KEGTAP_IMAGE_DIR", help = "Directory holding beer images.")]
    pub image_dir: Option<PathBuf>,

    #[clap(long, env = "KEGTAP_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "KEGTAP_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "KEGTAP_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            bind_address: other.bind_address.or(self.bind_address),
            database_url: other.database_url.or(self.database_url),
            max_connections: other.max_connections.or(self.max_connections),
            image_dir: other.image_dir.or(self.image_dir),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    fn defaults() -> Config {
        Config {
            port: Some(DEFAULT_PORT),
            bind_address: Some(DEFAULT_BIND.to_string()),
            database_url: Some(DEFAULT_DATABASE_URL.to_string()),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
            image_dir: Some(PathBuf::from(DEFAULT_IMAGE_DIR)),
            config_path: None,
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Socket address to bind: `bind_address:port`.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let host = self.bind_address.as_deref().unwrap_or(DEFAULT_BIND);
        format!("{host}:{}", self.port())
            .parse()
            .with_context(|| format!("Invalid bind address: {host}"))
    }

    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.image_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_DIR))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Layers defaults, the JSON config file and CLI/env values (highest wins).
///
/// A missing config file is fine; an unreadable or malformed one is an error.
pub fn resolve_config(cli: Config) -> anyhow::Result<Config> {
    // 1. Load defaults
    let mut current = Config::defaults();

    // 2. Load from config file if present
    let config_file = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if let Some(file_config) = read_config_file(&config_file)? {
        current = current.merge(file_config);
    }

    // 3. Override with environment variables and CLI arguments
    Ok(current.merge(cli))
}

fn read_config_file(path: &Path) -> anyhow::Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let parsed = serde_json::from_str::<Config>(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(Some(parsed))
}

/// Loads `.env`, parses CLI/env and resolves the final configuration.
pub fn load_config() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    resolve_config(Config::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let dir = tempdir().unwrap();
        let cli = Config {
            config_path: Some(dir.path().join("absent.conf")),
            ..Default::default()
        };
        let config = resolve_config(cli).unwrap();
        assert_eq!(config.port(), 5000);
        assert_eq!(config.database_url(), "sqlite://kegtap.db");
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn test_file_then_cli_precedence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server_taps.conf");
        fs::write(
            &path,
            r#"{"port": 8080, "databaseUrl": "sqlite://file.db", "logLevel": "debug"}"#,
        )
        .unwrap();

        let cli = Config {
            config_path: Some(path),
            port: Some(9090),
            ..Default::default()
        };
        let config = resolve_config(cli).unwrap();
        assert_eq!(config.port(), 9090);
        assert_eq!(config.database_url(), "sqlite://file.db");
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.max_connections(), 5);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.conf");
        fs::write(&path, "{ port: nope").unwrap();
        let cli = Config {
            config_path: Some(path),
            ..Default::default()
        };
        assert!(resolve_config(cli).is_err());
    }

    #[test]
    fn test_bad_bind_address() {
        let config = Config {
            bind_address: Some("not an ip".into()),
            ..Default::default()
        };
        assert!(config.listen_addr().is_err());
    }
}
