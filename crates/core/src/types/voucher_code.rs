//! Voucher code type.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`VoucherCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VoucherCodeError {
    /// The input string is empty after trimming.
    #[error("voucher code cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("voucher code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The code contains whitespace or punctuation.
    #[error("voucher code may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// A voucher code, compared case-insensitively.
///
/// Codes are trimmed and upper-cased on parse, so `summer20` and ` SUMMER20 `
/// are the same code. Persisted codes go through the same normalization.
///
/// ```
/// use sundry_core::VoucherCode;
///
/// let code = VoucherCode::parse(" summer20 ").unwrap();
/// assert_eq!(code.as_str(), "SUMMER20");
/// assert_eq!(code, VoucherCode::parse("SUMMER20").unwrap());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Maximum length of a voucher code.
    pub const MAX_LENGTH: usize = 64;

    /// Parse and normalize a voucher code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is blank, longer than 64 characters, or
    /// contains characters other than ASCII letters, digits, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, VoucherCodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VoucherCodeError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(VoucherCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(VoucherCodeError::InvalidCharacter);
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Parse an optional, possibly blank code.
    ///
    /// A blank string means "no voucher", the same as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error for non-blank input that fails [`VoucherCode::parse`].
    pub fn parse_optional(s: Option<&str>) -> Result<Option<Self>, VoucherCodeError> {
        match s.map(str::trim) {
            None | Some("") => Ok(None),
            Some(code) => Self::parse(code).map(Some),
        }
    }

    /// Returns the normalized code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for VoucherCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VoucherCode {
    type Err = VoucherCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for VoucherCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        assert_eq!(
            VoucherCode::parse("freeShip_10").map(|c| c.as_str().to_owned()),
            Ok("FREESHIP_10".to_owned())
        );
    }

    #[test]
    fn test_parse_rejects_blank_and_spaces() {
        assert_eq!(VoucherCode::parse("  "), Err(VoucherCodeError::Empty));
        assert_eq!(
            VoucherCode::parse("SUMMER 20"),
            Err(VoucherCodeError::InvalidCharacter)
        );
    }

    #[test]
    fn test_parse_too_long() {
        let long = "A".repeat(65);
        assert!(matches!(
            VoucherCode::parse(&long),
            Err(VoucherCodeError::TooLong { max: 64 })
        ));
    }

    #[test]
    fn test_parse_optional_blank_is_none() {
        assert_eq!(VoucherCode::parse_optional(None), Ok(None));
        assert_eq!(VoucherCode::parse_optional(Some("   ")), Ok(None));
        assert!(matches!(
            VoucherCode::parse_optional(Some("vip")),
            Ok(Some(code)) if code.as_str() == "VIP"
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let parsed: Result<VoucherCode, _> = serde_json::from_str("\"welcome\"");
        assert!(matches!(parsed, Ok(code) if code.as_str() == "WELCOME"));

        let invalid: Result<VoucherCode, _> = serde_json::from_str("\"wel come\"");
        assert!(invalid.is_err());
    }
}
