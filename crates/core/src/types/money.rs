//! Integer money in the smallest currency unit.
//!
//! The store trades in a single currency with no fractional unit, so every
//! amount is a whole number of that unit. Percentages are applied through
//! [`Decimal`] and rounded back explicitly at each call site, never implicitly.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// How a fractional amount is brought back to whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Drop the fraction (toward negative infinity).
    Floor,
    /// Round to the nearest unit, halves away from zero.
    Nearest,
}

/// An amount of money in the smallest currency unit.
///
/// Arithmetic saturates instead of overflowing: an order large enough to
/// reach `i64::MAX` is a data error, not something to panic over.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from whole currency units.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// The amount in whole currency units.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Subtraction that saturates at the numeric bounds.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Clamp the amount to be no lower than zero.
    #[must_use]
    pub const fn non_negative(self) -> Self {
        if self.0 < 0 { Self::ZERO } else { self }
    }

    /// Half of the amount, rounded down.
    #[must_use]
    pub const fn half_floor(self) -> Self {
        Self(self.0.div_euclid(2))
    }

    /// `percent`% of this amount, rounded as requested.
    ///
    /// Returns `Money::ZERO` for a zero amount and saturates if the result
    /// does not fit in an `i64`.
    #[must_use]
    pub fn percent(self, percent: Decimal, rounding: Rounding) -> Self {
        let raw = Decimal::from(self.0) * percent / Decimal::ONE_HUNDRED;
        Self::from_decimal(raw, rounding)
    }

    /// Convert a decimal amount to whole units.
    #[must_use]
    pub fn from_decimal(value: Decimal, rounding: Rounding) -> Self {
        let rounded = match rounding {
            Rounding::Floor => value.floor(),
            Rounding::Nearest => {
                value.round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            }
        };
        let amount = rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        });
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.0
    }
}

// SQLx support (with postgres feature); stored as BIGINT
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
