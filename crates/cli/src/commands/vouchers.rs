//! Voucher maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Fold rows left in the legacy redemption table into user_voucher
//! sundry-cli vouchers consolidate
//!
//! # Report what would change without writing
//! sundry-cli vouchers consolidate --dry-run
//! ```

use sundry_core::redemption;
use sundry_storefront::db::VoucherRepository;

use super::{CliError, connect};

/// Consolidate legacy redemption rows.
///
/// Runs in one transaction: the staging rows are locked, merged into the
/// live table and deleted. A dry run rolls everything back.
///
/// # Errors
///
/// Returns `CliError` if any query fails.
pub async fn consolidate(dry_run: bool) -> Result<(), CliError> {
    let pool = connect().await?;
    let mut tx = pool.begin().await?;

    let legacy = VoucherRepository::new(&mut tx).legacy_rows().await?;
    let legacy_count = legacy.len();
    let records = redemption::consolidate(legacy);

    let merged = VoucherRepository::new(&mut tx)
        .merge_redemptions(&records)
        .await?;
    let cleared = VoucherRepository::new(&mut tx).clear_legacy().await?;

    tracing::info!(
        legacy_rows = legacy_count,
        records = records.len(),
        merged,
        cleared,
        dry_run,
        "Voucher redemption records consolidated"
    );

    if dry_run {
        tx.rollback().await?;
        tracing::info!("Dry run: changes rolled back");
    } else {
        tx.commit().await?;
    }
    Ok(())
}
