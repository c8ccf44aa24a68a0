//! Configuration loading utilities.
//!
//! This module provides layered configuration loading using figment:
//! - Default values (compiled in)
//! - Configuration file (TOML)
//! - Environment variables
//!
//! # Example
//!
//! ```rust,ignore
//! use dialer_common::config::{DatabaseConfig, load_config};
//!
//! // Load configuration from defaults + file + env
//! let config: DatabaseConfig = load_config("dialer", None)?;
//! ```

#[cfg(feature = "config")]
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections to maintain.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle connection timeout in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_database_url() -> String {
    "postgres://localhost/dialer".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging.
    #[serde(default)]
    pub json_logs: bool,

    /// Service name for tracing.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "dialer-core".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
        }
    }
}

/// Reservation engine configuration.
///
/// Values here are defaults only: every operation that takes an explicit
/// `ttl_seconds`, `limit`, or `multiplier` argument overrides the
/// corresponding default for that single call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReservationConfig {
    /// Default reservation TTL in seconds, used when `ReserveNext` omits one.
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: i64,

    /// Default sample pool multiplier (`target * multiplier`) used by
    /// `BuildPool` when no explicit limit is given.
    #[serde(default = "default_pool_multiplier")]
    pub default_pool_multiplier: u32,

    /// Floor applied to the computed pool size regardless of multiplier.
    #[serde(default = "default_pool_floor")]
    pub default_pool_floor: u32,

    /// How often the standalone TTL sweeper task runs, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_seconds() -> i64 {
    900
}

fn default_pool_multiplier() -> u32 {
    5
}

fn default_pool_floor() -> u32 {
    1000
}

fn default_sweep_interval_secs() -> u64 {
    30
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: default_ttl_seconds(),
            default_pool_multiplier: default_pool_multiplier(),
            default_pool_floor: default_pool_floor(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Complete dialer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DialerConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Reservation engine configuration.
    #[serde(default)]
    pub reservation: ReservationConfig,
}

/// Load configuration from layered sources.
///
/// Sources (in order of precedence):
/// 1. Defaults (lowest)
/// 2. Configuration file (if provided)
/// 3. Environment variables (highest)
///
/// Environment variables are prefixed with the uppercase `prefix` followed by `_`.
/// For example, with prefix "dialer", `DIALER_DATABASE_URL` sets `database.url`.
#[cfg(feature = "config")]
pub fn load_config<T: Default + Serialize + for<'de> Deserialize<'de>>(
    prefix: &str,
    config_file: Option<&str>,
) -> Result<T, figment::Error> {
    let mut figment = Figment::new().merge(Serialized::defaults(T::default()));

    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(&format!("{}_", prefix.to_uppercase())).split("_"));

    figment.extract()
}

/// Load dialer configuration from defaults, file, and environment.
#[cfg(feature = "config")]
pub fn load_dialer_config(config_file: Option<&str>) -> Result<DialerConfig, figment::Error> {
    load_config("dialer", config_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_dialer_config_defaults() {
        let config = DialerConfig::default();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.reservation.default_ttl_seconds, 900);
        assert_eq!(config.reservation.default_pool_multiplier, 5);
        assert_eq!(config.reservation.default_pool_floor, 1000);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_load_config_defaults() {
        let config: DialerConfig = load_config("test", None).unwrap();
        assert_eq!(config.database.max_connections, 10);
    }
}
