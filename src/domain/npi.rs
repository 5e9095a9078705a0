use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A National Provider Identifier.
///
/// Ten digits whose Luhn checksum, computed over the number prefixed with
/// the `80840` health industry issuer code, is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Npi(String);

/// Issuer prefix for US health care identifiers (ISO/IEC 7812).
const NPI_PREFIX: &str = "80840";

impl Npi {
    /// Parses and validates an NPI.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not ten digits or the checksum fails.
    pub fn parse(s: &str) -> Result<Self, NpiError> {
        let s = s.trim();
        if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NpiError::Format(s.to_string()));
        }
        if !luhn_valid(&format!("{NPI_PREFIX}{s}")) {
            return Err(NpiError::Checksum(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// The ten digit identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn luhn_valid(digits: &str) -> bool {
    let total: u32 = digits
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    total % 10 == 0
}

impl FromStr for Npi {
    type Err = NpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Npi {
    type Error = NpiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Npi> for String {
    fn from(value: Npi) -> Self {
        value.0
    }
}

impl fmt::Display for Npi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An NPI failed validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NpiError {
    /// Not exactly ten ASCII digits.
    #[error("NPI '{0}' must be exactly 10 digits")]
    Format(String),
    /// Check digit mismatch.
    #[error("NPI '{0}' has an invalid check digit")]
    Checksum(String),
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("1234567893"; "textbook example")]
    #[test_case(" 1234567893 "; "surrounding whitespace")]
    fn valid_npi_is_accepted(input: &str) {
        assert_eq!(Npi::parse(input).unwrap().as_str(), "1234567893");
    }

    #[test]
    fn bad_check_digit_is_rejected() {
        assert_eq!(
            Npi::parse("1234567890"),
            Err(NpiError::Checksum("1234567890".into()))
        );
    }

    #[test_case("123456789"; "too short")]
    #[test_case("12345678931"; "too long")]
    #[test_case("12345a7893"; "non digit")]
    fn malformed_npi_is_rejected(input: &str) {
        assert!(matches!(Npi::parse(input), Err(NpiError::Format(_))));
    }
}
