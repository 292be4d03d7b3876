//! Coupon API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! `main` loads `.env` first, so a local file works the same as real variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use coupon_db::DbConfig;
use coupon_engine::EngineConfig;

/// Coupon API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// HTTP listen address
    pub bind_addr: String,

    /// SQLite database file
    pub database_path: String,

    /// Connection pool size
    pub db_max_connections: u32,

    /// Redis connection string (optional; in-memory cache when unset)
    pub redis_url: Option<String>,

    /// Cap on a single coupon's cache lifetime
    pub coupon_cache_ttl_cap: Duration,

    /// Cap on the valid-coupons snapshot lifetime
    pub valid_coupons_cache_ttl: Duration,

    /// Deadline for the locked part of a validation
    pub validation_timeout: Duration,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(ApiConfig {
            http_port: parse_var("HTTP_PORT", "8080")?,

            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "coupons.db".to_string()),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "8")?,

            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),

            coupon_cache_ttl_cap: Duration::from_secs(parse_var(
                "COUPON_CACHE_TTL_CAP_SECS",
                "3600", // 1 hour
            )?),

            valid_coupons_cache_ttl: Duration::from_secs(parse_var(
                "VALID_COUPONS_CACHE_TTL_SECS",
                "600", // 10 minutes
            )?),

            validation_timeout: Duration::from_millis(parse_var("VALIDATION_TIMEOUT_MS", "5000")?),
        })
    }

    /// `host:port` to bind.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.http_port)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .coupon_ttl_cap(self.coupon_cache_ttl_cap)
            .collection_ttl(self.valid_coupons_cache_ttl)
            .validation_timeout(self.validation_timeout)
    }
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_and_invalid() {
        let port: u16 = parse_var("COUPON_API_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);

        let err = parse_var::<u16>("COUPON_API_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref name) if name == "COUPON_API_TEST_UNSET_PORT"));
    }

    #[test]
    fn test_derived_configs() {
        let config = ApiConfig {
            http_port: 9090,
            bind_addr: "127.0.0.1".to_string(),
            database_path: "test.db".to_string(),
            db_max_connections: 4,
            redis_url: None,
            coupon_cache_ttl_cap: Duration::from_secs(60),
            valid_coupons_cache_ttl: Duration::from_secs(30),
            validation_timeout: Duration::from_millis(250),
        };

        assert_eq!(config.listen_addr(), "127.0.0.1:9090");
        assert_eq!(config.db_config().max_connections, 4);

        let engine = config.engine_config();
        assert_eq!(engine.coupon_ttl_cap, Duration::from_secs(60));
        assert_eq!(engine.collection_ttl, Duration::from_secs(30));
        assert_eq!(engine.validation_timeout, Duration::from_millis(250));
    }
}
