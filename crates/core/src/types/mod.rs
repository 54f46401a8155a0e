//! Core types for Sundry.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod phone;
pub mod status;
pub mod voucher_code;

pub use id::*;
pub use money::{Money, Rounding};
pub use phone::{PhoneNumber, PhoneNumberError};
pub use status::*;
pub use voucher_code::{VoucherCode, VoucherCodeError};
