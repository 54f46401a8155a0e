//! Order maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Apply overdue-payment and auto-complete transitions once
//! sundry-cli orders sweep
//! ```
//!
//! Thresholds come from the same environment variables as the storefront
//! (`PAYMENT_DUE_HOURS`, `AUTO_COMPLETE_DAYS`, `LOYALTY_EARN_PERCENT`).

use chrono::Utc;

use sundry_storefront::config::LifecycleConfig;
use sundry_storefront::services::sweeper;

use super::{CliError, connect};

/// Run one lifecycle sweep.
///
/// # Errors
///
/// Returns `CliError` if configuration is invalid or the sweep fails.
pub async fn sweep() -> Result<(), CliError> {
    let pool = connect().await?;
    let lifecycle = LifecycleConfig::from_env()?;

    let report = sweeper::run_once(&pool, &lifecycle, Utc::now()).await?;

    tracing::info!(
        marked_overdue = report.marked_overdue,
        auto_completed = report.auto_completed,
        skipped = report.skipped,
        "Order sweep complete"
    );
    Ok(())
}
