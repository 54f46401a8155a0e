//! Order pricing engine.
//!
//! Pricing is a pure function of the live checkout state: the caller resolves
//! products, the voucher record, the customer's balance and the shipping
//! catalog, then asks [`quote::preview`] for a best-effort projection or
//! [`quote::finalize`] for the strict re-validation done at order creation.
//!
//! ```text
//! lines ──► subtotal ─┬─► voucher::validate ───► discount
//!                     ├─► loyalty::redeem ─────► points_applied
//! method ─────────────┴─► shipping::resolve ───► shipping_fee
//!
//! total = max(0, subtotal + shipping_fee - discount - points_applied)
//! ```

pub mod line;
pub mod loyalty;
pub mod quote;
pub mod shipping;
pub mod voucher;

pub use line::{LineError, OrderLine};
pub use loyalty::{LoyaltyError, Redemption};
pub use quote::{
    CheckoutError, CheckoutInput, NoticeField, OrderQuote, Preview, PreviewNotice, QuotedLine,
    finalize, preview,
};
pub use shipping::{ShippingCatalog, ShippingError, ShippingMethod};
pub use voucher::{AppliedVoucher, UserVoucher, Voucher, VoucherEvaluation, VoucherLookup, VoucherRejection};
