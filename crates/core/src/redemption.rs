//! Consolidation of legacy voucher redemption records.
//!
//! Older rows tracked redemption with an `is_used` flag and a copied
//! `user_usage_limit`, and nothing prevented one customer from holding the
//! same voucher twice. [`consolidate`] folds those rows into the current
//! shape: one record per `(customer, voucher)` carrying a usage count.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CustomerId, VoucherId};

/// A row as found in a database that predates usage counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct LegacyRedemption {
    pub customer_id: CustomerId,
    pub voucher_id: VoucherId,
    pub usage_count: Option<i32>,
    pub is_used: Option<bool>,
    pub user_usage_limit: Option<i32>,
    pub saved_at: DateTime<Utc>,
}

impl LegacyRedemption {
    /// The usage count this row stands for.
    ///
    /// An explicit count wins. Otherwise a used flag counts as the row's own
    /// limit (one when unset) and an unused or missing flag as zero. Negative
    /// counts are treated as zero.
    #[must_use]
    pub fn effective_usage(&self) -> i32 {
        self.usage_count
            .unwrap_or_else(|| match self.is_used {
                Some(true) => self.user_usage_limit.unwrap_or(1),
                _ => 0,
            })
            .max(0)
    }
}

/// A consolidated redemption record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub customer_id: CustomerId,
    pub voucher_id: VoucherId,
    pub usage_count: i32,
    pub saved_at: DateTime<Utc>,
}

/// Backfill usage counts and merge duplicates.
///
/// Duplicates of a `(customer, voucher)` pair sum their usage counts and keep
/// the earliest `saved_at`. Output is ordered by customer then voucher.
#[must_use]
pub fn consolidate<I>(rows: I) -> Vec<RedemptionRecord>
where
    I: IntoIterator<Item = LegacyRedemption>,
{
    let mut merged: BTreeMap<(CustomerId, VoucherId), RedemptionRecord> = BTreeMap::new();

    for row in rows {
        let usage = row.effective_usage();
        merged
            .entry((row.customer_id, row.voucher_id))
            .and_modify(|record| {
                record.usage_count = record.usage_count.saturating_add(usage);
                record.saved_at = record.saved_at.min(row.saved_at);
            })
            .or_insert_with(|| RedemptionRecord {
                customer_id: row.customer_id,
                voucher_id: row.voucher_id,
                usage_count: usage,
                saved_at: row.saved_at,
            });
    }

    merged.into_values().collect()
}
