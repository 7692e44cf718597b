//! Per-field validation of candidate values.
//!
//! [`validate`] is a pure function: it looks at the field definition and the
//! value and returns the message of the first failing rule.

use crate::form::{Field, FieldId, FieldKind, FieldValue};
use ahash::AHashMap;
use regex::Regex;
use std::sync::LazyLock;

/// Validation messages keyed by field id.
pub type FieldErrors = AHashMap<FieldId, String>;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const NOT_EMPTY_MESSAGE: &str = "This field cannot be empty";
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const PASSWORD_MESSAGE: &str =
    "Password must be at least 8 characters long and contain at least 1 number";

const PASSWORD_MIN_LENGTH: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Checks `value` against the rules of `field`.
///
/// Rules run in a fixed order and the first failure wins: required, not-empty,
/// minimum length, maximum length, email shape, password strength. Derived
/// fields are always valid.
pub fn validate(field: &Field, value: &FieldValue) -> Option<String> {
    let (required, rules) = match field.kind() {
        FieldKind::Derived(_) => return None,
        FieldKind::Independent {
            required,
            validation,
            ..
        } => (*required, validation),
    };

    if required && value.is_blank() {
        return Some(REQUIRED_MESSAGE.to_string());
    }
    if rules.not_empty && value.is_blank() {
        return Some(NOT_EMPTY_MESSAGE.to_string());
    }

    // The remaining rules only look at values that are actually present.
    if value.is_empty() {
        return None;
    }
    let len = value.char_len();

    if let Some(min) = rules.min_length.filter(|min| *min > 0) {
        if len < min {
            return Some(format!("Minimum length is {}", min));
        }
    }
    if let Some(max) = rules.max_length.filter(|max| *max > 0) {
        if len > max {
            return Some(format!("Maximum length is {}", max));
        }
    }
    if rules.email && !is_email(&value.to_string()) {
        return Some(EMAIL_MESSAGE.to_string());
    }
    if rules.password_rule && !is_strong_password(&value.to_string()) {
        return Some(PASSWORD_MESSAGE.to_string());
    }
    None
}

/// Validates every field of a form against the provided values.
///
/// Missing values are validated as empty.
pub fn validate_all<'a, I>(fields: I, values: &AHashMap<FieldId, FieldValue>) -> FieldErrors
where
    I: IntoIterator<Item = &'a Field>,
{
    let empty = FieldValue::Empty;
    fields
        .into_iter()
        .filter_map(|field| {
            let value = values.get(field.id()).unwrap_or(&empty);
            validate(field, value).map(|message| (field.id().clone(), message))
        })
        .collect()
}

fn is_email(text: &str) -> bool {
    EMAIL_PATTERN.is_match(text)
}

fn is_strong_password(text: &str) -> bool {
    text.chars().count() >= PASSWORD_MIN_LENGTH && text.chars().any(|c| c.is_ascii_digit())
}
