//! Shipping method catalog and fee resolution.

use serde::{Deserialize, Serialize};

use crate::Money;

/// A delivery option offered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ShippingMethod {
    /// Stable identifier, e.g. `standard` or `express`.
    pub code: String,
    pub name: String,
    pub fee: Money,
    pub is_active: bool,
    pub sort_order: i32,
}

/// A shipping method that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShippingError {
    #[error("Shipping method '{0}' is not available")]
    Unavailable(String),
    #[error("No shipping method is currently available")]
    NoneAvailable,
}

/// The shipping methods known at checkout time, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingCatalog {
    methods: Vec<ShippingMethod>,
}

impl ShippingCatalog {
    /// Build a catalog, ordering by `sort_order` then `code`.
    #[must_use]
    pub fn new(mut methods: Vec<ShippingMethod>) -> Self {
        methods.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.code.cmp(&b.code)));
        Self { methods }
    }

    /// Active methods in display order.
    pub fn active(&self) -> impl Iterator<Item = &ShippingMethod> {
        self.methods.iter().filter(|m| m.is_active)
    }

    /// Look up an explicitly selected method.
    ///
    /// # Errors
    ///
    /// Returns [`ShippingError::Unavailable`] if the code is unknown or the
    /// method is inactive.
    pub fn resolve(&self, code: &str) -> Result<&ShippingMethod, ShippingError> {
        let code = code.trim();
        self.active()
            .find(|m| m.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| ShippingError::Unavailable(code.to_owned()))
    }

    /// The method preselected when the customer has not chosen one.
    ///
    /// # Errors
    ///
    /// Returns [`ShippingError::NoneAvailable`] if every method is inactive.
    pub fn default_method(&self) -> Result<&ShippingMethod, ShippingError> {
        self.active().next().ok_or(ShippingError::NoneAvailable)
    }
}
