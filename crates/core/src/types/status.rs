//! Status enums for orders, payments, vouchers and actors.
//!
//! Each enum maps to a Postgres enum type of the same snake_case name (with
//! the `postgres` feature) and serializes in snake_case, which is also what
//! `Display` and `FromStr` use.

use serde::{Deserialize, Serialize};

/// Order status.
///
/// The happy path is `New -> Confirmed -> Preparing -> ShippingInProgress ->
/// Delivered -> Completed`; the other variants are side branches. Which moves
/// are legal is decided by [`crate::order::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    Confirmed,
    Preparing,
    ShippingInProgress,
    Delivered,
    Completed,
    CancellationRequested,
    Cancelled,
    PaymentOverdue,
    DeliveryFailed,
    ReturnRequested,
    Refunded,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 12] = [
        Self::New,
        Self::Confirmed,
        Self::Preparing,
        Self::ShippingInProgress,
        Self::Delivered,
        Self::Completed,
        Self::CancellationRequested,
        Self::Cancelled,
        Self::PaymentOverdue,
        Self::DeliveryFailed,
        Self::ReturnRequested,
        Self::Refunded,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::ShippingInProgress => "shipping_in_progress",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::CancellationRequested => "cancellation_requested",
            Self::Cancelled => "cancelled",
            Self::PaymentOverdue => "payment_overdue",
            Self::DeliveryFailed => "delivery_failed",
            Self::ReturnRequested => "return_requested",
            Self::Refunded => "refunded",
        }
    }

    /// Human readable label for timelines and notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "Order placed",
            Self::Confirmed => "Confirmed by shop",
            Self::Preparing => "Preparing",
            Self::ShippingInProgress => "Shipping in progress",
            Self::Delivered => "Delivered",
            Self::Completed => "Completed",
            Self::CancellationRequested => "Cancellation requested",
            Self::Cancelled => "Cancelled",
            Self::PaymentOverdue => "Payment overdue",
            Self::DeliveryFailed => "Delivery failed",
            Self::ReturnRequested => "Return requested",
            Self::Refunded => "Refunded",
        }
    }

    /// No transition leaves a terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Refunded)
    }

    /// Whether the customer can cancel immediately, without shop approval.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::New | Self::Confirmed | Self::Preparing)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery. Never becomes overdue.
    #[default]
    Cod,
    BankTransfer,
    Card,
    EWallet,
}

impl PaymentMethod {
    /// Whether payment is expected before the order ships.
    #[must_use]
    pub const fn is_prepaid(self) -> bool {
        !matches!(self, Self::Cod)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
            Self::EWallet => "e_wallet",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "bank_transfer" => Ok(Self::BankTransfer),
            "card" => Ok(Self::Card),
            "e_wallet" => Ok(Self::EWallet),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

/// Who performed an order transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "actor_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// The customer who placed the order.
    Customer,
    /// Shop staff.
    Shop,
    /// Scheduled jobs (overdue payment, auto-completion).
    System,
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Shop => write!(f, "shop"),
            Self::System => write!(f, "system"),
        }
    }
}

/// How a voucher's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "discount_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percent of the subtotal, optionally capped.
    Percentage,
    /// Flat amount off.
    Fixed,
}

/// Who may redeem a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "voucher_visibility", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum VoucherVisibility {
    /// Anyone who knows the code.
    #[default]
    Public,
    /// Only customers holding a saved record for it.
    Private,
}
