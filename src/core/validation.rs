//! Validation utilities for caller-supplied values
//!
//! Small checks shared by request handling and configuration loading.

use std::fmt;

/// A caller-facing validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl crate::core::error_handling::ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Require a non-blank string field
pub fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(&format!("{} is required", field)));
    }
    Ok(())
}

/// Require a strictly positive byte count
pub fn require_positive_size(field: &str, size: u64) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::new(&format!("{} is empty", field)));
    }
    Ok(())
}

/// Only http:// and https:// destinations are accepted
pub fn validate_http_url(field: &str, url: &str) -> Result<(), ValidationError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ValidationError::new(&format!(
            "{} must be an http:// or https:// URL, got '{}'",
            field, url
        ))),
    }
}

/// Parse a string-encoded boolean ("true"/"false", case-insensitive)
pub fn parse_flag(value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ValidationError::new(&format!(
            "'{}' is not a boolean, expected 'true' or 'false'",
            other
        ))),
    }
}
