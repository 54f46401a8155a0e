//! Order documents as returned by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sundry_core::order::TimelineEntry;
use sundry_core::pricing::QuotedLine;
use sundry_core::{
    CustomerId, Money, OrderId, OrderStatus, PaymentMethod, PaymentStatus, PhoneNumber,
    VoucherCode,
};

/// A validated delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub phone_number: PhoneNumber,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub street: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
}

/// A persisted order with its lines and full timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub status_label: &'static str,
    /// Status the order returns to if a pending cancellation request is declined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_status: Option<OrderStatus>,
    pub order_lines: Vec<QuotedLine>,
    pub shipping_method: String,
    pub shipping_method_name: String,
    pub voucher_code: Option<VoucherCode>,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub discount: Money,
    pub points_applied: i64,
    pub total_amount: Money,
    pub loyalty_earned: i64,
    pub shipping_address: ShippingAddress,
    pub payment: Payment,
    pub timeline: Vec<TimelineEntry>,
    pub can_cancel: bool,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}

/// One row of the customer's order history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub item_count: i64,
    pub total_amount: Money,
    pub payment: Payment,
    pub can_cancel: bool,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}
