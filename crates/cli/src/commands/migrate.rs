//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! sundry-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/storefront/migrations/`:
//!
//! ```text
//! migrations/
//! ├── 20260301000001_create_checkout_schema.sql
//! └── 20260301000002_consolidate_user_vouchers.sql
//! ```

use super::{CliError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `CliError` if connecting or migrating fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
