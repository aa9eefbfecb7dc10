//! Field validation shared by the marketplace documents.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CommerceError, CommerceResult};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});
static GSTIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z]{1}[1-9A-Z]{1}Z[0-9A-Z]{1}$")
        .expect("valid GSTIN regex")
});
static PAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]{1}$").expect("valid PAN regex"));
static ACCOUNT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{9,18}$").expect("valid account number regex"));
static IFSC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").expect("valid IFSC regex"));

pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn is_gstin(value: &str) -> bool {
    GSTIN.is_match(value)
}

pub fn is_pan(value: &str) -> bool {
    PAN.is_match(value)
}

pub fn is_account_number(value: &str) -> bool {
    ACCOUNT_NUMBER.is_match(value)
}

pub fn is_ifsc(value: &str) -> bool {
    IFSC.is_match(value)
}

/// Trim a required string field, failing with `message` when blank.
pub fn required(value: &str, message: &str) -> CommerceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommerceError::invalid(message));
    }
    Ok(trimmed.to_string())
}

/// Fail when `value` is longer than `max` characters.
pub fn max_len(value: &str, max: usize, field: &str) -> CommerceResult<()> {
    if value.chars().count() > max {
        return Err(CommerceError::invalid(format!(
            "{} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

/// URL slug: lowercase, spaces become `-`, anything outside `[A-Za-z0-9_-]`
/// is dropped.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
