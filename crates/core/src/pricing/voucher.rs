//! Voucher eligibility and discount rules.
//!
//! A voucher is checked against the subtotal it would discount, the current
//! time and the customer's redemption record. Checks run in a fixed order so
//! the customer always sees the most fundamental reason first: existence,
//! validity window, active flag, authorization, minimum spend, usage limits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    CustomerId, DiscountType, Money, Rounding, VoucherCode, VoucherId, VoucherVisibility,
};

/// A discount code and its eligibility rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: VoucherId,
    pub code: VoucherCode,
    pub visibility: VoucherVisibility,
    pub discount_type: DiscountType,
    /// Percent (0-100] for [`DiscountType::Percentage`], amount for [`DiscountType::Fixed`].
    pub discount_value: Decimal,
    pub min_purchase_amount: Money,
    /// Cap on a percentage discount. `None` means uncapped.
    pub max_discount_amount: Option<Money>,
    /// Total redemptions allowed across all customers. `None` means unlimited.
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub per_user_limit: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

/// A customer's saved/redeemed record for one voucher.
///
/// At most one exists per `(customer_id, voucher_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVoucher {
    pub customer_id: CustomerId,
    pub voucher_id: VoucherId,
    pub usage_count: i32,
}

/// Why a voucher cannot be applied.
///
/// Messages are shown to the customer verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoucherRejection {
    #[error("Voucher {code} does not exist")]
    NotFound { code: VoucherCode },
    #[error("Voucher {code} is not valid at this time")]
    Expired { code: VoucherCode },
    #[error("Voucher {code} is no longer active")]
    Inactive { code: VoucherCode },
    #[error("Voucher {code} is not available for your account")]
    Unauthorized { code: VoucherCode },
    #[error("Voucher {code} requires a minimum order of {required}; add {shortfall} more to use it")]
    BelowMinimum {
        code: VoucherCode,
        required: Money,
        shortfall: Money,
    },
    #[error("Voucher {code} has reached its usage limit")]
    UsageExceeded { code: VoucherCode },
}

impl VoucherRejection {
    /// Stable machine-readable reason.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Expired { .. } => "expired",
            Self::Inactive { .. } => "inactive",
            Self::Unauthorized { .. } => "unauthorized",
            Self::BelowMinimum { .. } => "below_minimum",
            Self::UsageExceeded { .. } => "usage_exceeded",
        }
    }
}

/// The result of looking a code up in the voucher store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoucherLookup {
    /// No voucher has this code.
    Missing(VoucherCode),
    /// The voucher, plus the customer's record for it if they have one.
    Found {
        voucher: Voucher,
        redemption: Option<UserVoucher>,
    },
}

impl VoucherLookup {
    /// The code the customer entered (normalized).
    #[must_use]
    pub const fn code(&self) -> &VoucherCode {
        match self {
            Self::Missing(code) => code,
            Self::Found { voucher, .. } => &voucher.code,
        }
    }
}

/// A voucher that passed every check, with the discount it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedVoucher {
    pub voucher_id: VoucherId,
    pub code: VoucherCode,
    pub discount: Money,
}

/// Outcome of checking a voucher, in the shape the checkout page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherEvaluation {
    pub code: VoucherCode,
    pub applicable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_kind: Option<&'static str>,
    pub discount_amount: Money,
}

impl VoucherEvaluation {
    #[must_use]
    pub fn from_result(code: VoucherCode, result: &Result<AppliedVoucher, VoucherRejection>) -> Self {
        match result {
            Ok(applied) => Self {
                code,
                applicable: true,
                reason: None,
                reason_kind: None,
                discount_amount: applied.discount,
            },
            Err(rejection) => Self {
                code,
                applicable: false,
                reason: Some(rejection.to_string()),
                reason_kind: Some(rejection.kind()),
                discount_amount: Money::ZERO,
            },
        }
    }
}

impl Voucher {
    /// Describe why the stored definition itself is unusable, if it is.
    ///
    /// Store-side validation; a voucher failing this should never have been
    /// saved.
    #[must_use]
    pub fn definition_error(&self) -> Option<&'static str> {
        match self.discount_type {
            DiscountType::Percentage
                if self.discount_value <= Decimal::ZERO
                    || self.discount_value > Decimal::ONE_HUNDRED =>
            {
                Some("percentage discount must be greater than 0 and at most 100")
            }
            DiscountType::Fixed if self.discount_value < Decimal::ZERO => {
                Some("fixed discount cannot be negative")
            }
            _ if self.max_discount_amount.is_some_and(Money::is_negative) => {
                Some("maximum discount cannot be negative")
            }
            _ if self.per_user_limit < 1 => Some("per-user limit must be at least 1"),
            _ if self.end_date < self.start_date => Some("end date is before start date"),
            _ => None,
        }
    }

    /// Whether `now` falls inside the inclusive validity window.
    #[must_use]
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Whether the global usage limit is used up.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.used_count >= limit)
    }

    /// Discount this voucher grants on `subtotal`, ignoring eligibility.
    ///
    /// Never exceeds the subtotal, and never exceeds `max_discount_amount`
    /// for a percentage voucher.
    #[must_use]
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let subtotal = subtotal.non_negative();
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let discount = subtotal.percent(self.discount_value, Rounding::Floor);
                self.max_discount_amount
                    .map_or(discount, |cap| discount.min(cap.non_negative()))
            }
            DiscountType::Fixed => Money::from_decimal(self.discount_value, Rounding::Floor),
        };
        raw.non_negative().min(subtotal)
    }
}

/// Check a voucher for a customer's order.
///
/// # Errors
///
/// Returns the first failing [`VoucherRejection`], in the order `NotFound`,
/// `Expired`, `Inactive`, `Unauthorized`, `BelowMinimum`, `UsageExceeded`.
pub fn validate(
    lookup: &VoucherLookup,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<AppliedVoucher, VoucherRejection> {
    let (voucher, redemption) = match lookup {
        VoucherLookup::Missing(code) => {
            return Err(VoucherRejection::NotFound { code: code.clone() });
        }
        VoucherLookup::Found {
            voucher,
            redemption,
        } => (voucher, redemption.as_ref()),
    };
    let code = || voucher.code.clone();

    if !voucher.is_within_window(now) {
        return Err(VoucherRejection::Expired { code: code() });
    }
    if !voucher.is_active {
        return Err(VoucherRejection::Inactive { code: code() });
    }
    if voucher.visibility == VoucherVisibility::Private && redemption.is_none() {
        return Err(VoucherRejection::Unauthorized { code: code() });
    }
    if subtotal < voucher.min_purchase_amount {
        return Err(VoucherRejection::BelowMinimum {
            code: code(),
            required: voucher.min_purchase_amount,
            shortfall: voucher.min_purchase_amount.saturating_sub(subtotal),
        });
    }
    let used_by_customer = redemption.map_or(0, |r| r.usage_count);
    if voucher.is_exhausted() || used_by_customer >= voucher.per_user_limit {
        return Err(VoucherRejection::UsageExceeded { code: code() });
    }

    Ok(AppliedVoucher {
        voucher_id: voucher.id,
        code: code(),
        discount: voucher.discount_for(subtotal),
    })
}
