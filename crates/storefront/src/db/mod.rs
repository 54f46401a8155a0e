//! Database operations for storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `customer` - Loyalty point balances
//! - `product` - Prices and discounts read at checkout (catalog is managed elsewhere)
//! - `shipping_method` - Shipping catalog
//! - `voucher` - Voucher definitions and global usage counters
//! - `user_voucher` - One redemption record per customer and voucher
//! - `legacy_user_voucher` - Staging area for redemption rows imported from the old system
//! - `customer_order`, `order_line`, `order_event` - Orders, their lines and timeline
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sundry-cli -- migrate
//! ```

pub mod catalog;
pub mod customers;
pub mod orders;
pub mod vouchers;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use catalog::CatalogRepository;
pub use customers::CustomerRepository;
pub use orders::OrderRepository;
pub use vouchers::VoucherRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost race on a conditional update.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
