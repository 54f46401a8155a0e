//! Recipient phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains something other than digits and separators.
    #[error("phone number may only contain digits, spaces, dashes and a leading +")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A delivery contact phone number.
///
/// Stored normalized: separators are removed, a leading `+` is kept.
///
/// ## Examples
///
/// ```
/// use sundry_core::PhoneNumber;
///
/// assert_eq!(PhoneNumber::parse("090 123-4567").unwrap().as_str(), "0901234567");
/// assert_eq!(PhoneNumber::parse("+84 90 123 4567").unwrap().as_str(), "+84901234567");
///
/// assert!(PhoneNumber::parse("").is_err());
/// assert!(PhoneNumber::parse("call me").is_err());
/// assert!(PhoneNumber::parse("123").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum number of digits (E.164 national numbers are at least this long).
    pub const MIN_DIGITS: usize = 9;
    /// Maximum number of digits (E.164 limit).
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains characters other than
    /// digits, spaces, dashes, dots or a leading `+`, or has a digit count
    /// outside 9-15.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let (prefix, rest) = trimmed
            .strip_prefix('+')
            .map_or(("", trimmed), |rest| ("+", rest));

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' => {}
                _ => return Err(PhoneNumberError::InvalidCharacter),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(PhoneNumberError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(format!("{prefix}{digits}")))
    }

    /// Returns the normalized number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PhoneNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators() {
        let phone = PhoneNumber::parse(" 0901.234.567 ");
        assert_eq!(phone.map(PhoneNumber::into_inner), Ok("0901234567".to_owned()));
    }

    #[test]
    fn test_parse_keeps_leading_plus() {
        let phone = PhoneNumber::parse("+1-415-555-0100");
        assert_eq!(phone.map(PhoneNumber::into_inner), Ok("+14155550100".to_owned()));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(PhoneNumber::parse("   "), Err(PhoneNumberError::Empty));
    }

    #[test]
    fn test_parse_rejects_letters_and_inner_plus() {
        assert_eq!(
            PhoneNumber::parse("0901abc567"),
            Err(PhoneNumberError::InvalidCharacter)
        );
        assert_eq!(
            PhoneNumber::parse("090+1234567"),
            Err(PhoneNumberError::InvalidCharacter)
        );
    }

    #[test]
    fn test_parse_length_bounds() {
        assert!(matches!(
            PhoneNumber::parse("12345678"),
            Err(PhoneNumberError::InvalidLength { .. })
        ));
        assert!(PhoneNumber::parse("123456789").is_ok());
        assert!(PhoneNumber::parse("123456789012345").is_ok());
        assert!(matches!(
            PhoneNumber::parse("1234567890123456"),
            Err(PhoneNumberError::InvalidLength { .. })
        ));
    }
}
