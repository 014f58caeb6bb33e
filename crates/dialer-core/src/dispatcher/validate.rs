//! Phone number format check.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DialerError;

/// E.164-ish: optional `+`, no leading zero, 2 to 15 digits.
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("phone pattern is a valid regex"));

pub fn validate_phone_number(number: &str) -> Result<(), DialerError> {
    if PHONE_REGEX.is_match(number) {
        Ok(())
    } else {
        Err(DialerError::validation(
            number,
            "expected E.164 format (+ and 2-15 digits, no leading zero)",
        ))
    }
}
