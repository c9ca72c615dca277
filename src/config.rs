//! Configuration module
//!
//! Loaded from a TOML file (`~/.config/charging-core/config.toml` by default,
//! overridable with `CHARGING_CONFIG`). Every section and key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::events::NotifierConfig;
use crate::shared::utills::RetryConfig;

pub const CONFIG_ENV_VAR: &str = "CHARGING_CONFIG";

/// Value of `database.url` that selects the DashMap-backed store
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub transactions: TransactionsConfig,
    #[serde(default)]
    pub topology: TopologyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds allowed for draining work after a shutdown signal
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SeaORM connection URL, or `memory`
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./charging.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseSection {
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case(MEMORY_DATABASE_URL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive; `RUST_LOG` wins when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub queue_capacity: usize,
    pub workers: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub dead_letter_capacity: usize,
    /// Broadcast buffer per subscriber
    pub bus_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 2,
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            dead_letter_capacity: 256,
            bus_capacity: 1024,
        }
    }
}

impl EventsConfig {
    pub fn notifier(&self) -> NotifierConfig {
        NotifierConfig {
            queue_capacity: self.queue_capacity,
            workers: self.workers,
            retry: RetryConfig {
                max_attempts: self.max_attempts,
                initial_delay: Duration::from_millis(self.initial_backoff_ms),
                backoff_multiplier: 2.0,
                max_delay: Duration::from_millis(self.max_backoff_ms),
            },
            dead_letter_capacity: self.dead_letter_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// `TXN-<epoch millis>`
    Timestamp,
    /// `TXN-<uuid v4>`
    Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionsConfig {
    pub id_strategy: IdStrategy,
}

impl Default for TransactionsConfig {
    fn default() -> Self {
        Self {
            id_strategy: IdStrategy::Timestamp,
        }
    }
}

/// Stations provisioned at startup. Saves are upserts, so restarting with
/// the same file is harmless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub stations: Vec<StationSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSeed {
    pub id: String,
    #[serde(default)]
    pub evses: Vec<EvseSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvseSeed {
    pub id: i32,
    /// kW
    #[serde(default = "default_evse_power")]
    pub max_power: f64,
    /// Connector ids `1..=connectors` are created
    #[serde(default = "default_connector_count")]
    pub connectors: i32,
}

fn default_evse_power() -> f64 {
    22.0
}

fn default_connector_count() -> i32 {
    1
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}

/// `CHARGING_CONFIG` if set, else the platform config dir
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path())
}

pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("charging-core")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert_eq!(cfg.transactions.id_strategy, IdStrategy::Timestamp);
        assert!(!cfg.database.is_memory());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [database]
            url = "memory"

            [logging]
            format = "json"

            [events]
            workers = 4
            max_attempts = 5

            [transactions]
            id_strategy = "uuid"
            "#,
        )
        .unwrap();

        assert!(cfg.database.is_memory());
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.transactions.id_strategy, IdStrategy::Uuid);

        let notifier = cfg.events.notifier();
        assert_eq!(notifier.workers, 4);
        assert_eq!(notifier.retry.max_attempts, 5);
        assert_eq!(notifier.retry.initial_delay, Duration::from_millis(200));
    }

    #[test]
    fn topology_seeds_fill_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [[topology.stations]]
            id = "ST-1"

            [[topology.stations.evses]]
            id = 1

            [[topology.stations.evses]]
            id = 2
            max_power = 150.0
            connectors = 2
            "#,
        )
        .unwrap();

        let station = &cfg.topology.stations[0];
        assert_eq!(station.id, "ST-1");
        assert_eq!(station.evses.len(), 2);
        assert_eq!(station.evses[0].max_power, 22.0);
        assert_eq!(station.evses[0].connectors, 1);
        assert_eq!(station.evses[1].connectors, 2);
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = AppConfig::from_toml("[server\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        assert!(default_config_path().ends_with("charging-core/config.toml"));
    }
}
