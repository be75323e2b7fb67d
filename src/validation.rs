//! Field validators shared by request payloads.
//!
//! The `validate_*` functions follow the `validator` custom-function shape so
//! they can be referenced from `#[validate(custom = "...")]`.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::borrow::Cow;
use validator::ValidationError;

/// Largest quantity, price or balance a request may carry.
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000);

static PHONE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s()+\-.]+$").unwrap());
static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn check_digit(digits: &[u32], first_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .zip((2..=first_weight).rev())
        .map(|(d, w)| d * w)
        .sum();
    let digit = 11 - (sum % 11);
    if digit >= 10 {
        0
    } else {
        digit
    }
}

/// Accepts a CPF with or without punctuation.
pub fn is_valid_cpf(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }
    check_digit(&digits[..9], 10) == digits[9] && check_digit(&digits[..10], 11) == digits[10]
}

/// `000.000.000-00`, or `None` when the value is not a valid CPF.
pub fn format_cpf(value: &str) -> Option<String> {
    if !is_valid_cpf(value) {
        return None;
    }
    let d = digits_only(value);
    Some(format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11]))
}

/// Digits of a Brazilian phone number (area code plus 8 or 9 digits).
/// A leading `55` country code is dropped.
pub fn normalize_phone(value: &str) -> Option<String> {
    if !PHONE_CHARS.is_match(value.trim()) {
        return None;
    }
    let mut digits = digits_only(value);
    if matches!(digits.len(), 12 | 13) && digits.starts_with("55") {
        digits.drain(..2);
    }
    matches!(digits.len(), 10 | 11).then_some(digits)
}

pub fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(value) {
        Ok(())
    } else {
        Err(error("cpf", "invalid CPF"))
    }
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    normalize_phone(value)
        .map(|_| ())
        .ok_or_else(|| error("phone", "phone must have 10 or 11 digits"))
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("blank", "must not be blank"))
    } else {
        Ok(())
    }
}

pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(error("negative", "must be zero or positive"))
    } else {
        Ok(())
    }
}

/// Non-negative and no larger than [`MAX_AMOUNT`].
pub fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(value)?;
    validate_signed_amount(value)
}

pub fn validate_signed_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.abs() > MAX_AMOUNT {
        Err(error("too_large", "must be at most 1000000000000 in magnitude"))
    } else {
        Ok(())
    }
}

pub fn validate_hex_color(value: &str) -> Result<(), ValidationError> {
    if HEX_COLOR.is_match(value) {
        Ok(())
    } else {
        Err(error("color", "color must be a #rgb or #rrggbb hex value"))
    }
}
