//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::config::{LifecycleConfig, StorefrontConfig};

/// Source of the current time.
pub type Clock = fn() -> DateTime<Utc>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    clock: Clock,
}

impl AppState {
    /// Create a new application state using the system clock.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        Self::with_clock(config, pool, Utc::now)
    }

    /// Create a new application state with an explicit clock.
    #[must_use]
    pub fn with_clock(config: StorefrontConfig, pool: PgPool, clock: Clock) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                clock,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the order lifecycle settings.
    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleConfig {
        &self.inner.config.lifecycle
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The current time according to the configured clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.inner.clock)()
    }
}
