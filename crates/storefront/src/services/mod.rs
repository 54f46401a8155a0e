//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`checkout`] - Order preview and placement
//! - [`orders`] - Order history and lifecycle transitions
//! - [`wallet`] - Saved vouchers
//! - [`sweeper`] - Time-based transitions (payment overdue, auto-complete)

pub mod checkout;
pub mod orders;
pub mod sweeper;
pub mod wallet;

pub use checkout::CheckoutService;
pub use orders::OrderService;
pub use sweeper::SweepReport;
pub use wallet::WalletService;
