use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Base URL of the remote persistence backend.
    pub remote_url: String,
    pub debounce_ms: u64,
    /// Fallback change-channel poll interval.
    pub poll_interval_ms: u64,
    /// Use the in-process broadcast bus for change notes.
    pub broadcast: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote_url: String::new(),
            debounce_ms: 1500,
            poll_interval_ms: 1000,
            broadcast: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// `memory` or `mongodb` (requires the `mongodb` feature).
    pub backend: String,
    pub database: String,
    /// Batched-write flush interval for non-critical item updates.
    pub batch_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            database: "braid".to_string(),
            batch_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration, weakest to strongest:
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml
    /// 3. Environment variables (SERVER_, LOG_, SYNC_, STORAGE_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::default()
                    .prefix("SERVER")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("LOG")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("SYNC")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("STORAGE")
                    .separator("_")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Secrets come from ENV only, never TOML.
        if cfg.storage.backend == "mongodb" {
            cfg.mongodb_uri = std::env::var("MONGODB_URI").map_err(|_| {
                ConfigError::Message(
                    "MONGODB_URI environment variable is required for the mongodb backend"
                        .to_string(),
                )
            })?;
        }

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_structure_parses() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 3100

            [cors]
            enabled = true
            origins = ["http://localhost:3000"]

            [logging]
            level = "debug"
            format = "json"

            [sync]
            enabled = true
            remote_url = "http://localhost:9000"
            debounce_ms = 500
            poll_interval_ms = 1000
            broadcast = true

            [storage]
            backend = "memory"
            database = "braid"
            batch_interval_ms = 1000
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3100);
        assert_eq!(config.sync.debounce_ms, 500);
        assert_eq!(config.storage.backend, "memory");
    }

    #[test]
    fn sections_default_when_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.sync.enabled);
        assert_eq!(config.logging.level, "info");
    }
}
