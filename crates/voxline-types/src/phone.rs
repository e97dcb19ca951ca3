//! Caller phone numbers in the national format the commerce backend expects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Country calling code for the national format accepted by the gateway.
const COUNTRY_PREFIX: &str = "+380";

/// Number of subscriber digits after the country prefix.
const SUBSCRIBER_DIGITS: usize = 9;

/// Error returned when a string cannot be normalized into a [`PhoneNumber`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a valid national phone number: {0:?}")]
pub struct PhoneParseError(pub String);

/// A caller phone number, normalized to `+380XXXXXXXXX`.
///
/// Accepts the common spoken and dialed spellings: with or without the
/// leading `+`, with the national trunk `0` prefix, and with spaces, dashes
/// or parentheses between digit groups.
///
/// `Display` masks all but the last four digits so call logs never carry a
/// full subscriber number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses and normalizes a phone number.
    pub fn parse(raw: &str) -> Result<Self, PhoneParseError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        // 380XXXXXXXXX (12 digits) or national 0XXXXXXXXX (10 digits).
        let subscriber = if digits.len() == 3 + SUBSCRIBER_DIGITS && digits.starts_with("380") {
            &digits[3..]
        } else if digits.len() == 1 + SUBSCRIBER_DIGITS && digits.starts_with('0') {
            &digits[1..]
        } else {
            return Err(PhoneParseError(raw.to_string()));
        };

        Ok(Self(format!("{COUNTRY_PREFIX}{subscriber}")))
    }

    /// Returns the canonical `+380XXXXXXXXX` form, e.g. for backend queries.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tail = &self.0[self.0.len() - 4..];
        write!(f, "***{tail}")
    }
}
