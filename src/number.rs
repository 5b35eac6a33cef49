//! Integer-encoded phone numbers.
//!
//! Numbers are stored as digits only (no `+`, spaces or dashes) so that the
//! call directory can consume them as strictly increasing integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidNumber {
    #[error("phone number contains no digits: {0:?}")]
    Empty(String),
    #[error("phone number does not fit in a 64-bit integer: {0:?}")]
    OutOfRange(String),
    #[error("phone number cannot be negative: {0}")]
    Negative(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PhoneNumber(i64);

impl PhoneNumber {
    /// Normalizes user input by dropping every non-digit character.
    pub fn parse(input: &str) -> Result<Self, InvalidNumber> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(InvalidNumber::Empty(input.to_string()));
        }
        digits
            .parse::<i64>()
            .map(Self)
            .map_err(|_| InvalidNumber::OutOfRange(input.to_string()))
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    /// `+94771234567` style rendering used for display.
    pub fn international(self) -> String {
        format!("+{}", self.0)
    }
}

impl TryFrom<i64> for PhoneNumber {
    type Error = InvalidNumber;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(InvalidNumber::Negative(value));
        }
        Ok(Self(value))
    }
}

impl From<PhoneNumber> for i64 {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

impl FromStr for PhoneNumber {
    type Err = InvalidNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
