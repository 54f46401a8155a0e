//! Saved vouchers.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use sundry_core::pricing::{Voucher, VoucherRejection};
use sundry_core::{CustomerId, VoucherCode, VoucherVisibility};

use crate::db::{CustomerRepository, VoucherRepository};
use crate::error::{AppError, Result};
use crate::middleware::{CurrentCustomer, ShopStaff};
use crate::models::SavedVoucher;

/// Voucher wallet service.
pub struct WalletService<'a> {
    pool: &'a PgPool,
}

impl<'a> WalletService<'a> {
    /// Create a new wallet service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Save a voucher to the customer's wallet.
    ///
    /// Vouchers that have not started yet can be saved ahead of time. Saving
    /// twice is not an error; the second flag is `false` when the voucher was
    /// already in the wallet. Private vouchers only reach a wallet through
    /// [`WalletService::grant`]; saving one that was never issued is refused.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Voucher` if the voucher does not exist, has ended,
    /// is inactive, or is private and was not issued to this customer.
    #[instrument(skip(self, customer), fields(customer_id = %customer.id, code = %code))]
    pub async fn save(
        &self,
        customer: &CurrentCustomer,
        code: &VoucherCode,
        now: DateTime<Utc>,
    ) -> Result<(SavedVoucher, bool)> {
        let mut tx = self.pool.begin().await?;

        let voucher = find_saveable(&mut tx, code, now).await?;
        if voucher.visibility == VoucherVisibility::Private {
            let issued = VoucherRepository::new(&mut tx)
                .saved_entry(customer.id, voucher.id)
                .await?;
            let Some((usage_count, saved_at)) = issued else {
                warn!(voucher = %voucher.code, "Private voucher save refused");
                return Err(VoucherRejection::Unauthorized {
                    code: voucher.code,
                }
                .into());
            };
            tx.commit().await?;
            return Ok((SavedVoucher::new(voucher, usage_count, saved_at, now), false));
        }

        CustomerRepository::new(&mut tx)
            .ensure(customer.id, &customer.name)
            .await?;
        let (saved, inserted) = store(&mut tx, customer.id, voucher, now).await?;
        tx.commit().await?;

        if inserted {
            info!(voucher = %saved.code, "Voucher saved");
        }
        Ok((saved, inserted))
    }

    /// Issue a voucher to a customer's wallet on behalf of the shop.
    ///
    /// This is how private vouchers are handed out. Granting a voucher the
    /// customer already holds is not an error; the flag is then `false`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Voucher` if the voucher does not exist, has ended
    /// or is inactive.
    #[instrument(skip(self, staff), fields(staff = %staff.name, code = %code))]
    pub async fn grant(
        &self,
        staff: &ShopStaff,
        customer_id: CustomerId,
        code: &VoucherCode,
        now: DateTime<Utc>,
    ) -> Result<(SavedVoucher, bool)> {
        let mut tx = self.pool.begin().await?;

        let voucher = find_saveable(&mut tx, code, now).await?;
        CustomerRepository::new(&mut tx)
            .ensure(customer_id, &format!("Customer {customer_id}"))
            .await?;
        let (saved, inserted) = store(&mut tx, customer_id, voucher, now).await?;
        tx.commit().await?;

        if inserted {
            info!(voucher = %saved.code, customer_id = %customer_id, "Voucher granted");
        }
        Ok((saved, inserted))
    }

    /// The customer's wallet, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    pub async fn list(&self, customer: &CurrentCustomer, now: DateTime<Utc>) -> Result<Vec<SavedVoucher>> {
        let mut conn = self.pool.acquire().await?;
        let saved = VoucherRepository::new(&mut conn).saved(customer.id).await?;
        Ok(saved
            .into_iter()
            .map(|(voucher, usage_count, saved_at)| SavedVoucher::new(voucher, usage_count, saved_at, now))
            .collect())
    }
}

/// Look a voucher up for saving: it must exist, be active and not have ended.
async fn find_saveable(conn: &mut PgConnection, code: &VoucherCode, now: DateTime<Utc>) -> Result<Voucher> {
    let voucher = VoucherRepository::new(conn)
        .find_by_code(code)
        .await?
        .ok_or_else(|| VoucherRejection::NotFound { code: code.clone() })?;
    if now > voucher.end_date {
        return Err(VoucherRejection::Expired { code: voucher.code }.into());
    }
    if !voucher.is_active {
        return Err(VoucherRejection::Inactive { code: voucher.code }.into());
    }
    Ok(voucher)
}

async fn store(
    conn: &mut PgConnection,
    customer_id: CustomerId,
    voucher: Voucher,
    now: DateTime<Utc>,
) -> Result<(SavedVoucher, bool)> {
    let mut vouchers = VoucherRepository::new(conn);
    let inserted = vouchers.save(customer_id, voucher.id).await?;
    let (usage_count, saved_at) = vouchers
        .saved_entry(customer_id, voucher.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("wallet entry for {} missing after save", voucher.code)))?;
    Ok((SavedVoucher::new(voucher, usage_count, saved_at, now), inserted))
}
