//! Voucher wallet entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use sundry_core::pricing::Voucher;
use sundry_core::{DiscountType, Money, VoucherCode, VoucherVisibility};

/// A voucher in the customer's wallet, with how often they have used it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedVoucher {
    pub code: VoucherCode,
    pub visibility: VoucherVisibility,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_purchase_amount: Money,
    pub max_discount_amount: Option<Money>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_count: i32,
    pub per_user_limit: i32,
    pub remaining_uses: i32,
    /// Whether the voucher can be applied right now, ignoring order minimums.
    pub usable: bool,
    pub saved_at: DateTime<Utc>,
}

impl SavedVoucher {
    #[must_use]
    pub fn new(voucher: Voucher, usage_count: i32, saved_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining_uses = voucher.per_user_limit.saturating_sub(usage_count).max(0);
        let usable = voucher.is_active
            && voucher.is_within_window(now)
            && !voucher.is_exhausted()
            && remaining_uses > 0;

        Self {
            code: voucher.code,
            visibility: voucher.visibility,
            discount_type: voucher.discount_type,
            discount_value: voucher.discount_value,
            min_purchase_amount: voucher.min_purchase_amount,
            max_discount_amount: voucher.max_discount_amount,
            start_date: voucher.start_date,
            end_date: voucher.end_date,
            usage_count,
            per_user_limit: voucher.per_user_limit,
            remaining_uses,
            usable,
            saved_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use sundry_core::VoucherId;

    use super::*;

    fn voucher(now: DateTime<Utc>) -> Voucher {
        Voucher {
            id: VoucherId::new(1),
            code: VoucherCode::parse("WELCOME").unwrap(),
            visibility: VoucherVisibility::Private,
            discount_type: DiscountType::Fixed,
            discount_value: Decimal::new(50_000, 0),
            min_purchase_amount: Money::new(100_000),
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            per_user_limit: 2,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
        }
    }

    #[test]
    fn test_remaining_uses() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();

        let fresh = SavedVoucher::new(voucher(now), 0, now, now);
        assert_eq!(fresh.remaining_uses, 2);
        assert!(fresh.usable);

        let used_up = SavedVoucher::new(voucher(now), 2, now, now);
        assert_eq!(used_up.remaining_uses, 0);
        assert!(!used_up.usable);
    }

    #[test]
    fn test_expired_voucher_is_not_usable() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
        let saved = SavedVoucher::new(voucher(now), 0, now, now + Duration::days(3));
        assert!(!saved.usable);
        assert_eq!(saved.remaining_uses, 2);
    }
}
