//! Field format checks shared by entity validators.
//!
//! Formats are checked for well-formedness only; no deliverability or
//! carrier lookups happen here.

use crate::model::errors::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ().\-]*[0-9]$").expect("valid phone regex"));

const PHONE_MIN_DIGITS: usize = 7;
const PHONE_MAX_DIGITS: usize = 15;

pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Optional text must be absent or non-blank.
pub fn optional_text(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(value) => require_text(field, value),
        None => Ok(()),
    }
}

pub fn check_email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(value.trim()) {
        return Ok(());
    }
    Err(ValidationError::InvalidEmail {
        field,
        value: value.to_string(),
    })
}

/// Accepts digits with optional leading `+` and common separators.
pub fn check_phone(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    if PHONE_RE.is_match(trimmed) && (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits) {
        return Ok(());
    }
    Err(ValidationError::InvalidPhone {
        field,
        value: value.to_string(),
    })
}

pub fn check_position(position: i64) -> Result<(), ValidationError> {
    if position < 0 {
        return Err(ValidationError::NegativePosition(position));
    }
    Ok(())
}
