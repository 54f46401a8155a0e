//! Voucher definitions, usage counters and customer wallets.
//!
//! Usage counters are only ever changed through conditional updates so that
//! concurrent checkouts cannot push a voucher past its limits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use sundry_core::pricing::{UserVoucher, Voucher, VoucherLookup};
use sundry_core::redemption::{LegacyRedemption, RedemptionRecord};
use sundry_core::{
    CustomerId, DiscountType, Money, VoucherCode, VoucherId, VoucherVisibility,
};

use super::RepositoryError;

/// Database row type for vouchers.
#[derive(Debug, sqlx::FromRow)]
struct VoucherRow {
    id: VoucherId,
    code: String,
    visibility: VoucherVisibility,
    discount_type: DiscountType,
    discount_value: Decimal,
    min_purchase_amount: Money,
    max_discount_amount: Option<Money>,
    usage_limit: Option<i32>,
    used_count: i32,
    per_user_limit: i32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
}

impl TryFrom<VoucherRow> for Voucher {
    type Error = RepositoryError;

    fn try_from(row: VoucherRow) -> Result<Self, Self::Error> {
        let code = VoucherCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid voucher code in database: {e}"))
        })?;

        let voucher = Self {
            id: row.id,
            code,
            visibility: row.visibility,
            discount_type: row.discount_type,
            discount_value: row.discount_value,
            min_purchase_amount: row.min_purchase_amount,
            max_discount_amount: row.max_discount_amount,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            per_user_limit: row.per_user_limit,
            start_date: row.start_date,
            end_date: row.end_date,
            is_active: row.is_active,
        };

        if let Some(problem) = voucher.definition_error() {
            return Err(RepositoryError::DataCorruption(format!(
                "voucher {}: {problem}",
                voucher.code
            )));
        }
        Ok(voucher)
    }
}

/// Database row type for wallet entries.
#[derive(Debug, sqlx::FromRow)]
struct SavedVoucherRow {
    #[sqlx(flatten)]
    voucher: VoucherRow,
    usage_count: i32,
    saved_at: DateTime<Utc>,
}

const VOUCHER_COLUMNS: &str = "v.id, v.code, v.visibility, v.discount_type, v.discount_value, \
     v.min_purchase_amount, v.max_discount_amount, v.usage_limit, v.used_count, \
     v.per_user_limit, v.start_date, v.end_date, v.is_active";

/// Repository for voucher operations.
pub struct VoucherRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> VoucherRepository<'c> {
    /// Create a new voucher repository.
    #[must_use]
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Find a voucher by code, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored definition is invalid.
    pub async fn find_by_code(&mut self, code: &VoucherCode) -> Result<Option<Voucher>, RepositoryError> {
        let row = sqlx::query_as::<_, VoucherRow>(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM voucher v WHERE upper(v.code) = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(Voucher::try_from).transpose()
    }

    /// The customer's redemption record for a voucher, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_voucher(
        &mut self,
        customer_id: CustomerId,
        voucher_id: VoucherId,
    ) -> Result<Option<UserVoucher>, RepositoryError> {
        let usage_count: Option<i32> = sqlx::query_scalar(
            r"
            SELECT usage_count
            FROM user_voucher
            WHERE customer_id = $1 AND voucher_id = $2
            ",
        )
        .bind(customer_id)
        .bind(voucher_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(usage_count.map(|usage_count| UserVoucher {
            customer_id,
            voucher_id,
            usage_count,
        }))
    }

    /// Everything the voucher rules need to judge `code` for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if either query fails.
    pub async fn lookup(
        &mut self,
        code: &VoucherCode,
        customer_id: CustomerId,
    ) -> Result<VoucherLookup, RepositoryError> {
        let Some(voucher) = self.find_by_code(code).await? else {
            return Ok(VoucherLookup::Missing(code.clone()));
        };
        let redemption = self.user_voucher(customer_id, voucher.id).await?;
        Ok(VoucherLookup::Found {
            voucher,
            redemption,
        })
    }

    /// Add a voucher to the customer's wallet.
    ///
    /// Returns `false` if it was already there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(
        &mut self,
        customer_id: CustomerId,
        voucher_id: VoucherId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO user_voucher (customer_id, voucher_id, usage_count)
            VALUES ($1, $2, 0)
            ON CONFLICT (customer_id, voucher_id) DO NOTHING
            ",
        )
        .bind(customer_id)
        .bind(voucher_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Usage count and save date of a wallet entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn saved_entry(
        &mut self,
        customer_id: CustomerId,
        voucher_id: VoucherId,
    ) -> Result<Option<(i32, DateTime<Utc>)>, RepositoryError> {
        let entry = sqlx::query_as::<_, (i32, DateTime<Utc>)>(
            r"
            SELECT usage_count, saved_at
            FROM user_voucher
            WHERE customer_id = $1 AND voucher_id = $2
            ",
        )
        .bind(customer_id)
        .bind(voucher_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(entry)
    }

    /// The customer's wallet, newest first, with the voucher definitions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a stored voucher is invalid.
    pub async fn saved(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<Vec<(Voucher, i32, DateTime<Utc>)>, RepositoryError> {
        let rows = sqlx::query_as::<_, SavedVoucherRow>(&format!(
            r"
            SELECT {VOUCHER_COLUMNS}, uv.usage_count, uv.saved_at
            FROM user_voucher uv
            JOIN voucher v ON v.id = uv.voucher_id
            WHERE uv.customer_id = $1
            ORDER BY uv.saved_at DESC, v.id
            "
        ))
        .bind(customer_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter()
            .map(|row| Ok((Voucher::try_from(row.voucher)?, row.usage_count, row.saved_at)))
            .collect()
    }

    /// Count one global use, unless the usage limit is already reached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn increment_usage(&mut self, voucher_id: VoucherId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE voucher
            SET used_count = used_count + 1
            WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)
            ",
        )
        .bind(voucher_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count one use by a customer, creating the record for public vouchers
    /// redeemed without saving, unless the per-user limit is reached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_redemption(
        &mut self,
        customer_id: CustomerId,
        voucher_id: VoucherId,
        per_user_limit: i32,
    ) -> Result<bool, RepositoryError> {
        let usage: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO user_voucher (customer_id, voucher_id, usage_count)
            VALUES ($1, $2, 1)
            ON CONFLICT (customer_id, voucher_id)
            DO UPDATE SET usage_count = user_voucher.usage_count + 1
            WHERE user_voucher.usage_count < $3
            RETURNING usage_count
            ",
        )
        .bind(customer_id)
        .bind(voucher_id)
        .bind(per_user_limit)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(usage.is_some())
    }

    // =========================================================================
    // Legacy redemption import
    // =========================================================================

    /// Rows waiting in the legacy staging table, locked until commit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn legacy_rows(&mut self) -> Result<Vec<LegacyRedemption>, RepositoryError> {
        let rows = sqlx::query_as::<_, LegacyRedemption>(
            r"
            SELECT customer_id, voucher_id, usage_count, is_used, user_usage_limit, saved_at
            FROM legacy_user_voucher
            ORDER BY id
            FOR UPDATE
            ",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    /// Merge consolidated records into the live table.
    ///
    /// A record for a pair that already exists adds its usage and keeps the
    /// earlier save date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn merge_redemptions(
        &mut self,
        records: &[RedemptionRecord],
    ) -> Result<u64, RepositoryError> {
        let mut merged = 0;
        for record in records {
            let result = sqlx::query(
                r"
                INSERT INTO user_voucher (customer_id, voucher_id, usage_count, saved_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (customer_id, voucher_id)
                DO UPDATE SET usage_count = user_voucher.usage_count + EXCLUDED.usage_count,
                              saved_at = LEAST(user_voucher.saved_at, EXCLUDED.saved_at)
                ",
            )
            .bind(record.customer_id)
            .bind(record.voucher_id)
            .bind(record.usage_count)
            .bind(record.saved_at)
            .execute(&mut *self.conn)
            .await?;
            merged += result.rows_affected();
        }
        Ok(merged)
    }

    /// Empty the legacy staging table.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_legacy(&mut self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM legacy_user_voucher")
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}
