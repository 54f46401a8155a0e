//! Loyalty point redemption and earning.
//!
//! One point is worth one currency unit. A redemption may cover at most half
//! of the subtotal and never more than the customer holds.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{Money, Rounding};

/// A redemption request that cannot be honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoyaltyError {
    #[error("points to apply cannot be negative (got {0})")]
    NegativeRequest(i64),
}

/// How many points a checkout actually redeems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    /// What the customer asked for.
    pub requested: i64,
    /// The most this order allows: `min(balance, floor(subtotal / 2))`.
    pub max_applicable: i64,
    pub points_applied: i64,
    pub value_applied: Money,
}

impl Redemption {
    /// No points requested.
    pub const NONE: Self = Self {
        requested: 0,
        max_applicable: 0,
        points_applied: 0,
        value_applied: Money::ZERO,
    };

    /// Whether the request was reduced to fit the ceiling.
    #[must_use]
    pub const fn was_clamped(&self) -> bool {
        self.points_applied < self.requested
    }
}

/// Largest redemption an order of `subtotal` allows for a balance.
#[must_use]
pub fn max_applicable(balance: i64, subtotal: Money) -> i64 {
    balance
        .max(0)
        .min(subtotal.non_negative().half_floor().amount())
}

/// Redeem up to `requested` points, clamping to the ceiling.
///
/// # Errors
///
/// Returns [`LoyaltyError::NegativeRequest`] for a negative request.
pub fn redeem(requested: i64, balance: i64, subtotal: Money) -> Result<Redemption, LoyaltyError> {
    if requested < 0 {
        return Err(LoyaltyError::NegativeRequest(requested));
    }
    let max_applicable = max_applicable(balance, subtotal);
    let points_applied = requested.min(max_applicable);

    Ok(Redemption {
        requested,
        max_applicable,
        points_applied,
        value_applied: Money::new(points_applied),
    })
}

/// Points earned when an order with `total` completes.
#[must_use]
pub fn earned_points(total: Money, earn_percent: Decimal) -> i64 {
    if earn_percent <= Decimal::ZERO {
        return 0;
    }
    total
        .non_negative()
        .percent(earn_percent, Rounding::Floor)
        .amount()
}
