//! Service configuration.
//!
//! Loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use retail_core::{PaymentMethod, DEFAULT_LOW_STOCK_THRESHOLD};
use retail_db::DbConfig;

/// Order service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// SQLite database file (`RETAIL_DB_PATH`)
    pub database_path: PathBuf,

    /// Pool size (`RETAIL_DB_MAX_CONNECTIONS`)
    pub max_connections: u32,

    /// SQLite busy timeout in milliseconds (`RETAIL_DB_BUSY_TIMEOUT_MS`)
    pub busy_timeout_ms: u64,

    /// Stock under this is reported (`RETAIL_LOW_STOCK_THRESHOLD`)
    pub low_stock_threshold: i64,

    /// Used when a payment request names no method
    /// (`RETAIL_DEFAULT_PAYMENT_METHOD`)
    pub default_payment_method: PaymentMethod,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            database_path: PathBuf::from("./retail.db"),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            default_payment_method: PaymentMethod::Cash,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServiceConfig::default();

        let config = ServiceConfig {
            database_path: lookup("RETAIL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: lookup("RETAIL_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| defaults.max_connections.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RETAIL_DB_MAX_CONNECTIONS".to_string()))?,

            busy_timeout_ms: lookup("RETAIL_DB_BUSY_TIMEOUT_MS")
                .unwrap_or_else(|| defaults.busy_timeout_ms.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RETAIL_DB_BUSY_TIMEOUT_MS".to_string()))?,

            low_stock_threshold: lookup("RETAIL_LOW_STOCK_THRESHOLD")
                .unwrap_or_else(|| defaults.low_stock_threshold.to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("RETAIL_LOW_STOCK_THRESHOLD".to_string())
                })?,

            default_payment_method: match lookup("RETAIL_DEFAULT_PAYMENT_METHOD") {
                Some(raw) => raw.parse().map_err(|_| {
                    ConfigError::InvalidValue("RETAIL_DEFAULT_PAYMENT_METHOD".to_string())
                })?,
                None => defaults.default_payment_method,
            },
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "RETAIL_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.low_stock_threshold < 0 {
            return Err(ConfigError::InvalidValue(
                "RETAIL_LOW_STOCK_THRESHOLD".to_string(),
            ));
        }

        Ok(config)
    }

    /// Storage settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
