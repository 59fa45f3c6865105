//! Pure validators for the three contact form fields.
//!
//! Every validator is a function of the current field text only, so running
//! it twice on the same input always yields the same classification.

use thiserror::Error;

use crate::{
    domain::{ContactField, FORBIDDEN_NAME_CHARACTERS, MESSAGE_MAX_CHARS, NAME_MAX_CHARS},
    sanitize::strip_markup,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("This field is required")]
    Required,
    #[error("Illegal characters: {}", join_chars(.0))]
    IllegalCharacters(Vec<char>),
    #[error("{actual}/{max} characters ({over_by} too many)")]
    TooLong {
        actual: usize,
        max: usize,
        over_by: usize,
    },
    #[error("HTML markup is not allowed")]
    ContainsMarkup,
}

fn join_chars(chars: &[char]) -> String {
    chars
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn check_length(actual: usize, max: usize) -> Result<(), FieldError> {
    if actual > max {
        return Err(FieldError::TooLong {
            actual,
            max,
            over_by: actual - max,
        });
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), FieldError> {
    if name.is_empty() {
        return Err(FieldError::Required);
    }

    let mut offending = Vec::new();
    for c in name.chars() {
        if FORBIDDEN_NAME_CHARACTERS.contains(&c) && !offending.contains(&c) {
            offending.push(c);
        }
    }
    if !offending.is_empty() {
        return Err(FieldError::IllegalCharacters(offending));
    }

    check_length(name.chars().count(), NAME_MAX_CHARS)
}

/// Only presence is checked; the server validates the address format.
pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if email.is_empty() {
        return Err(FieldError::Required);
    }
    Ok(())
}

pub fn validate_message(message: &str) -> Result<(), FieldError> {
    if message.is_empty() {
        return Err(FieldError::Required);
    }

    let length = message.chars().count();
    // Partial strips and full strips are reported the same way.
    if strip_markup(message).chars().count() != length {
        return Err(FieldError::ContainsMarkup);
    }

    check_length(length, MESSAGE_MAX_CHARS)
}

pub fn validate_field(field: ContactField, value: &str) -> Result<(), FieldError> {
    match field {
        ContactField::Name => validate_name(value),
        ContactField::Email => validate_email(value),
        ContactField::Message => validate_message(value),
    }
}

/// Text shown under a field: its error, or a live character counter.
pub fn helper_text(field: ContactField, value: &str, error: Option<&FieldError>) -> String {
    if let Some(error) = error {
        return error.to_string();
    }
    match field.max_chars() {
        Some(max) => format!("{}/{max} characters", value.chars().count()),
        None => String::new(),
    }
}
