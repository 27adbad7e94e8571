//! One-time passcode values.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    /// The input is not exactly six characters long.
    #[error("passcode must be exactly {expected} digits (got {actual})")]
    WrongLength {
        /// Required length.
        expected: usize,
        /// Length of the input.
        actual: usize,
    },
    /// The input contains a non-digit.
    #[error("passcode must contain only ASCII digits")]
    NotNumeric,
}

/// A six-digit checkout passcode.
///
/// Leading zeros are allowed when parsing user input, but generated codes are
/// always in `100000..=999999` (see [`OtpCode::from_number`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in a passcode.
    pub const LENGTH: usize = 6;
    /// Smallest generated code.
    pub const MIN: u32 = 100_000;
    /// Largest generated code.
    pub const MAX: u32 = 999_999;

    /// Parse user input into a passcode.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpCodeError> {
        if s.len() != Self::LENGTH {
            return Err(OtpCodeError::WrongLength {
                expected: Self::LENGTH,
                actual: s.chars().count(),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpCodeError::NotNumeric);
        }
        Ok(Self(s.to_owned()))
    }

    /// Build a code from a number, clamped into the generated range.
    #[must_use]
    pub fn from_number(n: u32) -> Self {
        Self(n.clamp(Self::MIN, Self::MAX).to_string())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OtpCode {
    type Err = OtpCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OtpCode {
    type Error = OtpCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}
