//! # Engine Configuration
//!
//! Configuration management for the Shelf engine and CLI.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHELF_DB_PATH=/var/lib/shelf/shelf.db                              │
//! │     SHELF_STRICT_ACCEPT=true                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/shelf/shelf.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.shelf.shelf/shelf.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/shelf/shelf.db"
//! max_connections = 5
//!
//! [orders]
//! strict_accept = false   # true: vendors may only accept APPROVED orders
//! auto_generate = true    # create a PENDING order on low stock
//!
//! [restock]
//! window_days = 90
//!
//! [outbox]
//! batch_size = 100
//! poll_interval_secs = 5
//! max_attempts = 10
//! ```

use serde::{Deserialize, Serialize};
use shelf_core::analytics::DEFAULT_WINDOW_DAYS;
use shelf_core::AcceptPolicy;
use shelf_db::DbConfig;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Sections
// =============================================================================

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "shelf", "shelf")
        .map(|dirs| dirs.data_dir().join("shelf.db"))
        .unwrap_or_else(|| PathBuf::from("shelf.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Purchase-order behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSettings {
    /// Only let vendors accept APPROVED orders (not PENDING ones).
    #[serde(default)]
    pub strict_accept: bool,

    /// Create a PENDING order when a stock-out hits the reorder level.
    #[serde(default = "default_true")]
    pub auto_generate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            strict_accept: false,
            auto_generate: true,
        }
    }
}

/// Restock report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockSettings {
    /// History window fed to demand analytics, in days.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

impl Default for RestockSettings {
    fn default() -> Self {
        RestockSettings {
            window_days: default_window_days(),
        }
    }
}

/// Notification outbox dispatcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Failed attempts after which an entry is left alone.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_batch_size() -> u32 {
    100
}
fn default_poll_interval() -> u64 {
    5
}
fn default_max_attempts() -> u32 {
    10
}

impl Default for OutboxSettings {
    fn default() -> Self {
        OutboxSettings {
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub orders: OrderSettings,

    #[serde(default)]
    pub restock: RestockSettings,

    #[serde(default)]
    pub outbox: OutboxSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (shelf.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(EngineError::InvalidConfig("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(EngineError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if !(1..=3650).contains(&self.restock.window_days) {
            return Err(EngineError::InvalidConfig(
                "restock.window_days must be between 1 and 3650".into(),
            ));
        }
        if self.outbox.batch_size == 0 {
            return Err(EngineError::InvalidConfig(
                "outbox.batch_size must be greater than 0".into(),
            ));
        }
        if self.outbox.max_attempts == 0 {
            return Err(EngineError::InvalidConfig(
                "outbox.max_attempts must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `SHELF_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SHELF_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("SHELF_STRICT_ACCEPT") {
            match parse_bool(&value) {
                Some(strict) => self.orders.strict_accept = strict,
                None => warn!(value = %value, "Ignoring invalid SHELF_STRICT_ACCEPT"),
            }
        }

        if let Some(value) = lookup("SHELF_AUTO_GENERATE") {
            match parse_bool(&value) {
                Some(enabled) => self.orders.auto_generate = enabled,
                None => warn!(value = %value, "Ignoring invalid SHELF_AUTO_GENERATE"),
            }
        }

        if let Some(days) = lookup("SHELF_RESTOCK_WINDOW_DAYS").and_then(|v| v.parse().ok()) {
            self.restock.window_days = days;
        }

        if let Some(attempts) = lookup("SHELF_OUTBOX_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.outbox.max_attempts = attempts;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "shelf", "shelf")
            .map(|dirs| dirs.config_dir().join("shelf.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Which source statuses vendors may accept from.
    pub fn accept_policy(&self) -> AcceptPolicy {
        if self.orders.strict_accept {
            AcceptPolicy::Strict
        } else {
            AcceptPolicy::Permissive
        }
    }

    /// Database pool configuration for these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
