//! User input validation
//!
//! The bot accepts exactly two kinds of free-text input, both validated here:
//! - apartment numbers: base-10 integers, deliberately unbounded (zero and
//!   negative values are accepted)
//! - phone numbers: 10 to 15 digits with an optional leading `+`, no
//!   separators

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Input did not parse as an integer apartment number
    #[error("Invalid apartment number: {0}")]
    InvalidApartmentNumber(String),

    /// Input did not match the phone number pattern
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
}

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?\d{10,15}$").expect("phone pattern must compile"));

/// Parses an apartment number from user text.
///
/// Surrounding whitespace is tolerated. There is no range check: any `i64`
/// is a valid apartment number.
///
/// # Examples
/// ```
/// use domofon::core::validation::parse_apartment_number;
///
/// assert_eq!(parse_apartment_number("5").unwrap(), 5);
/// assert_eq!(parse_apartment_number(" 42 ").unwrap(), 42);
/// assert_eq!(parse_apartment_number("-3").unwrap(), -3);
///
/// assert!(parse_apartment_number("5a").is_err());
/// assert!(parse_apartment_number("пять").is_err());
/// ```
pub fn parse_apartment_number(text: &str) -> Result<i64, ValidationError> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidApartmentNumber(text.to_string()))
}

/// Validates a phone number against `^\+?\d{10,15}$`.
///
/// # Examples
/// ```
/// use domofon::core::validation::validate_phone_number;
///
/// assert!(validate_phone_number("+79991234567").is_ok());
/// assert!(validate_phone_number("89991234567").is_ok());
///
/// assert!(validate_phone_number("12345").is_err());
/// assert!(validate_phone_number("+12-345-6789").is_err());
/// ```
pub fn validate_phone_number(text: &str) -> Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(text) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhoneNumber(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== parse_apartment_number Tests ====================

    #[test]
    fn test_parse_apartment_number_valid() {
        let cases = vec![("5", 5), ("042", 42), ("  17  ", 17), ("0", 0), ("-3", -3)];

        for (input, expected) in cases {
            assert_eq!(
                parse_apartment_number(input).unwrap(),
                expected,
                "Failed for: {}",
                input
            );
        }
    }

    #[test]
    fn test_parse_apartment_number_invalid() {
        let invalid = vec!["", "abc", "5a", "5.0", "5 5", "кв. 5", "+"];

        for input in invalid {
            assert!(
                parse_apartment_number(input).is_err(),
                "Should fail for: {:?}",
                input
            );
        }
    }

    // ==================== validate_phone_number Tests ====================

    #[test]
    fn test_validate_phone_number_valid() {
        let valid = vec![
            "+79991234567",
            "79991234567",
            "1234567890",       // exactly 10 digits
            "123456789012345",  // exactly 15 digits
            "+123456789012345", // plus and 15 digits
        ];

        for input in valid {
            assert!(validate_phone_number(input).is_ok(), "Failed for: {}", input);
        }
    }

    #[test]
    fn test_validate_phone_number_invalid() {
        let invalid = vec![
            "12345",             // too short
            "123456789",         // 9 digits, still too short
            "1234567890123456",  // 16 digits, too long
            "abc1234567",        // letters
            "+12-345-6789",      // separators
            "+7 999 123 45 67",  // spaces
            "++79991234567",     // double plus
            "79991234567+",      // plus at the end
            "",
        ];

        for input in invalid {
            assert!(
                validate_phone_number(input).is_err(),
                "Should fail for: {:?}",
                input
            );
        }
    }

    #[test]
    fn test_validation_error_messages() {
        let err = parse_apartment_number("abc").unwrap_err();
        assert!(err.to_string().contains("Invalid apartment number"));

        let err = validate_phone_number("12345").unwrap_err();
        assert!(err.to_string().contains("Invalid phone number"));
    }
}
