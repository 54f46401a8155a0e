//! Domain models for the storefront API.
//!
//! These types are the request and response shapes of the HTTP API and are
//! kept separate from the database row types in [`crate::db`].

pub mod checkout;
pub mod order;
pub mod voucher;

pub use checkout::{
    CreateOrderRequest, CreatedOrder, LineRequest, PreviewOrder, PreviewRequest, PreviewResponse,
    ShippingAddressInput, SubmittedPreview,
};
pub use order::{Order, OrderSummary, Payment, ShippingAddress};
pub use voucher::SavedVoucher;
