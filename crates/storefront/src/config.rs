//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Fraction of errors sent to Sentry (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Fraction of transactions traced (default: 0.0)
//! - `LOYALTY_EARN_PERCENT` - Share of the order total credited as points on completion (default: 1)
//! - `PAYMENT_DUE_HOURS` - Hours a prepaid order may stay unpaid (default: 24)
//! - `AUTO_COMPLETE_DAYS` - Days after delivery before an order completes on its own (default: 7)
//! - `SWEEP_INTERVAL_SECS` - Interval between lifecycle sweeps, 0 disables (default: 300)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
    /// Order lifecycle thresholds
    pub lifecycle: LifecycleConfig,
}

/// Loyalty and time-based lifecycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Percentage of a completed order's total credited as points.
    pub loyalty_earn_percent: Decimal,
    /// How long a prepaid order may wait for payment.
    pub payment_due: Duration,
    /// How long a delivered order waits for the customer before completing.
    pub auto_complete_after: Duration,
    /// Sweep period; `None` disables the background sweeper.
    pub sweep_interval: Option<Duration>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            loyalty_earn_percent: Decimal::ONE,
            payment_due: Duration::from_secs(24 * 60 * 60),
            auto_complete_after: Duration::from_secs(7 * 24 * 60 * 60),
            sweep_interval: Some(Duration::from_secs(300)),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;

        Ok(Self {
            database_url,
            host,
            port,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
            lifecycle: LifecycleConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl LifecycleConfig {
    /// Load lifecycle settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for unparsable or negative values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let loyalty_earn_percent: Decimal = parse_env_or_default("LOYALTY_EARN_PERCENT", "1")?;
        if loyalty_earn_percent.is_sign_negative() || loyalty_earn_percent > Decimal::ONE_HUNDRED {
            return Err(ConfigError::InvalidEnvVar(
                "LOYALTY_EARN_PERCENT".to_string(),
                "must be between 0 and 100".to_string(),
            ));
        }

        let payment_due_hours: u64 = parse_env_or_default("PAYMENT_DUE_HOURS", "24")?;
        let auto_complete_days: u64 = parse_env_or_default("AUTO_COMPLETE_DAYS", "7")?;
        let sweep_secs: u64 = parse_env_or_default("SWEEP_INTERVAL_SECS", "300")?;

        Ok(Self {
            loyalty_earn_percent,
            payment_due: Duration::from_secs(payment_due_hours.saturating_mul(60 * 60)),
            auto_complete_after: Duration::from_secs(
                auto_complete_days.saturating_mul(24 * 60 * 60),
            ),
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_optional_env(key).unwrap_or_else(|| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_valid() {
        let port: u16 = parse_value("STOREFRONT_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);

        let percent: Decimal = parse_value("LOYALTY_EARN_PERCENT", "1.5").unwrap();
        assert_eq!(percent, Decimal::new(15, 1));
    }

    #[test]
    fn test_parse_value_invalid() {
        let result = parse_value::<u16>("STOREFRONT_PORT", "not-a-port");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "STOREFRONT_PORT"
        ));
    }

    #[test]
    fn test_lifecycle_defaults() {
        let lifecycle = LifecycleConfig::default();
        assert_eq!(lifecycle.loyalty_earn_percent, Decimal::ONE);
        assert_eq!(lifecycle.payment_due, Duration::from_secs(86_400));
        assert_eq!(lifecycle.auto_complete_after, Duration::from_secs(604_800));
        assert_eq!(lifecycle.sweep_interval, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test".to_string()),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            lifecycle: LifecycleConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_config_debug_redacts_database_url() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://app:hunter2@db/sundry".to_string()),
            host: "0.0.0.0".parse().unwrap(),
            port: 3000,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            lifecycle: LifecycleConfig::default(),
        };

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
