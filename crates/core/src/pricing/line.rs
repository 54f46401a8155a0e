//! Order lines and their derived prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Money, ProductId, Rounding};

/// A line that cannot be priced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("quantity for product {product_id} must be at least 1")]
    ZeroQuantity { product_id: ProductId },
    #[error("discount for product {product_id} must be between 0 and 100 percent (got {percent})")]
    DiscountOutOfRange {
        product_id: ProductId,
        percent: Decimal,
    },
    #[error("price for product {product_id} cannot be negative")]
    NegativePrice { product_id: ProductId },
}

/// One product in an order, priced from the catalog at the time of checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    /// List price per unit.
    pub unit_price: Money,
    /// Catalog markdown, 0-100.
    pub discount_percent: Decimal,
    pub quantity: u32,
}

impl OrderLine {
    /// Check the line invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`LineError`] for a zero quantity, a negative price or a
    /// markdown outside 0-100 %.
    pub fn validate(&self) -> Result<(), LineError> {
        if self.quantity == 0 {
            return Err(LineError::ZeroQuantity {
                product_id: self.product_id,
            });
        }
        if self.unit_price.is_negative() {
            return Err(LineError::NegativePrice {
                product_id: self.product_id,
            });
        }
        if self.discount_percent < Decimal::ZERO || self.discount_percent > Decimal::ONE_HUNDRED {
            return Err(LineError::DiscountOutOfRange {
                product_id: self.product_id,
                percent: self.discount_percent,
            });
        }
        Ok(())
    }

    /// Unit price after the catalog markdown, rounded to the nearest unit.
    #[must_use]
    pub fn actual_unit_price(&self) -> Money {
        self.unit_price
            .percent(Decimal::ONE_HUNDRED - self.discount_percent, Rounding::Nearest)
    }

    #[must_use]
    pub fn line_total(&self) -> Money {
        self.actual_unit_price().times(self.quantity)
    }
}
