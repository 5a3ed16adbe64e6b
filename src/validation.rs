//! Field-level validation shared by the provider and service area payloads.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_PHONE: &str =
    "Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.";
pub const INVALID_NUMBER: &str = "A valid number is required.";

pub const NAME_MAX_LEN: usize = 255;
pub const EMAIL_MAX_LEN: usize = 254;
pub const LABEL_MAX_LEN: usize = 64;
pub const PHONE_MAX_LEN: usize = 32;

lazy_static! {
    // local@domain.tld, no whitespace, at least one dot in the domain
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"(?i)^[A-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?(?:\.[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?)*\.[A-Z]{2,63}$"
    ).unwrap();

    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?1?\d{9,15}$").unwrap();
}

/// Validation messages keyed by field name.
///
/// Serializes as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error set holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

pub fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Deserialize a field that appears in the body, so an explicit `null`
/// becomes `Some(null)` while an absent field falls back to `None`.
///
/// Use with `#[serde(default, deserialize_with = "present")]`.
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Check a required text field: present, non-null, not blank, not too long.
///
/// Records an error and returns `None` on failure. The stored value is trimmed.
pub fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Option<String>>,
    max_len: usize,
) -> Option<String> {
    let Some(value) = value.flatten() else {
        errors.add(field, REQUIRED);
        return None;
    };

    let value = value.trim();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }

    if value.chars().count() > max_len {
        errors.add(field, max_length_message(max_len));
        return None;
    }

    Some(value.to_string())
}

/// Check an optional text field. Absent defaults to an empty string,
/// `null` is rejected.
pub fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Option<String>>,
    max_len: usize,
) -> Option<String> {
    let value = match value {
        None => return Some(String::new()),
        Some(None) => {
            errors.add(field, NULL);
            return None;
        }
        Some(Some(value)) => value,
    };

    let value = value.trim();
    if value.chars().count() > max_len {
        errors.add(field, max_length_message(max_len));
        return None;
    }
    Some(value.to_string())
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= EMAIL_MAX_LEN && EMAIL_REGEX.is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_REGEX.is_match(value)
}
