//! Sundry Core - Checkout domain library.
//!
//! This crate provides the rules shared by every Sundry component:
//! - `storefront` - HTTP service for checkout and order tracking
//! - `cli` - Command-line tools for migrations and maintenance sweeps
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Callers load the live state (catalog, voucher, balance),
//! hand it to the pricing engine, and persist whatever it decides.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, statuses, phone numbers and voucher codes
//! - [`pricing`] - Voucher validation, loyalty redemption, shipping fees and order totals
//! - [`order`] - Order status state machine and timeline
//! - [`redemption`] - Consolidation of legacy voucher redemption records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod order;
pub mod pricing;
pub mod redemption;
pub mod types;

pub use types::*;
