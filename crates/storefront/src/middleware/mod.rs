//! HTTP middleware and extractors for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span with `request_id` and `customer_id` fields)
//! 3. Request ID (record in span, tag Sentry scope, echo in response)
//!
//! Identity comes from the upstream gateway via the [`auth`] extractors.

pub mod auth;
pub mod request_id;

pub use auth::{CurrentCustomer, RequireCustomer, RequireStaff, ShopStaff};
pub use request_id::{REQUEST_ID_HEADER, make_request_span, request_id_middleware};
