//! Checkout request and response bodies.

use serde::{Deserialize, Deserializer, Serialize};

use sundry_core::pricing::{OrderQuote, Preview, PreviewNotice, VoucherEvaluation};
use sundry_core::{Money, OrderId, PaymentMethod, PhoneNumber, ProductId, VoucherCode};

use super::order::{Order, ShippingAddress};

/// A product and quantity picked by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// `POST /api/orders/preview` body.
///
/// `voucherCode` must be present; `null` or a blank string means no voucher.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub order_lines: Vec<LineRequest>,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(deserialize_with = "required_voucher_code")]
    pub voucher_code: Option<VoucherCode>,
    #[serde(default)]
    pub points_to_apply: i64,
}

/// The priced projection returned to the checkout page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOrder {
    #[serde(flatten)]
    pub quote: OrderQuote,
    pub points_to_apply: i64,
    pub max_applicable_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher: Option<VoucherEvaluation>,
}

/// `POST /api/orders/preview` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub preview_order: PreviewOrder,
    pub notices: Vec<PreviewNotice>,
}

impl From<Preview> for PreviewResponse {
    fn from(preview: Preview) -> Self {
        Self {
            preview_order: PreviewOrder {
                quote: preview.quote,
                points_to_apply: preview.redemption.requested,
                max_applicable_points: preview.redemption.max_applicable,
                voucher: preview.voucher,
            },
            notices: preview.notices,
        }
    }
}

/// The preview the customer confirmed, echoed back at creation.
///
/// Only the selection is trusted; the amounts are recomputed and the total
/// must match.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedPreview {
    pub order_lines: Vec<LineRequest>,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(deserialize_with = "required_voucher_code")]
    pub voucher_code: Option<VoucherCode>,
    #[serde(default)]
    pub points_applied: i64,
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub shipping_fee: Money,
    #[serde(default)]
    pub discount: Money,
    pub total_amount: Money,
}

/// Shipping address as typed by the customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub recipient_name: String,
    pub phone_number: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub street: String,
}

impl ShippingAddressInput {
    /// Trim every field and validate the phone number.
    ///
    /// # Errors
    ///
    /// Returns a customer-facing message naming the first invalid field.
    pub fn validate(self) -> Result<ShippingAddress, String> {
        fn required(value: String, field: &str) -> Result<String, String> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(format!("shippingAddress.{field} is required"))
            } else {
                Ok(trimmed.to_owned())
            }
        }

        let phone_number = PhoneNumber::parse(&self.phone_number)
            .map_err(|e| format!("shippingAddress.phoneNumber: {e}"))?;

        Ok(ShippingAddress {
            recipient_name: required(self.recipient_name, "recipientName")?,
            phone_number,
            province: required(self.province, "province")?,
            district: required(self.district, "district")?,
            ward: required(self.ward, "ward")?,
            street: required(self.street, "street")?,
        })
    }
}

/// `POST /api/orders` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub preview_order: SubmittedPreview,
    pub shipping_address: ShippingAddressInput,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// `POST /api/orders` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub order: Order,
}

/// Deserialize a voucher code key that must be present but may be `null`.
///
/// Using `deserialize_with` on an `Option` field without `#[serde(default)]`
/// makes serde report a missing key instead of defaulting to `None`.
fn required_voucher_code<'de, D>(deserializer: D) -> Result<Option<VoucherCode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    VoucherCode::parse_optional(raw.as_deref()).map_err(serde::de::Error::custom)
}
