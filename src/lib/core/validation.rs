use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::core::{NewTodo, TodoChanges, TodoId};

pub const MAX_TEXT_CHARS: usize = 500;

static DANGEROUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<script|javascript:|data:|vbscript:|onload|onerror|onclick")
        .expect("dangerous content pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Todo text must be a string")]
    NotAString,
    #[error("Todo text cannot be empty")]
    Empty,
    #[error("Todo text cannot exceed 500 characters")]
    TooLong,
    #[error("Todo text contains potentially dangerous content")]
    Dangerous,
    #[error("Completed must be a boolean")]
    CompletedNotBool,
    #[error("Nothing to update")]
    NoChanges,
    #[error("Invalid todo ID format")]
    InvalidId,
    #[error("Invalid request data")]
    MalformedBody,
}

impl ValidationError {
    /// Schema-level failures are reported as `Validation failed` with the
    /// reason in `details`; the cheaper shape checks carry their reason as the
    /// error itself.
    pub fn is_schema_failure(&self) -> bool {
        matches!(self, ValidationError::Dangerous)
    }
}

/// Runs the text pipeline: presence and type, trim, emptiness, length,
/// dangerous patterns, then angle-bracket stripping.
pub fn validate_text(raw: Option<&Value>) -> Result<String, ValidationError> {
    let text = match raw {
        Some(Value::String(s)) if !s.is_empty() => s.as_str(),
        _ => return Err(ValidationError::NotAString),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err(ValidationError::TooLong);
    }
    if DANGEROUS_PATTERN.is_match(trimmed) {
        return Err(ValidationError::Dangerous);
    }

    let sanitized: String = trimmed.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return Err(ValidationError::Empty);
    }
    Ok(sanitized.to_string())
}

pub fn validate_new_todo(body: &Value) -> Result<NewTodo, ValidationError> {
    let text = validate_text(body.get("text"))?;
    Ok(NewTodo { text })
}

pub fn validate_changes(body: &Value) -> Result<TodoChanges, ValidationError> {
    let text = match body.get("text") {
        None | Some(Value::Null) => None,
        raw => Some(validate_text(raw)?),
    };
    let completed = match body.get("completed") {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => return Err(ValidationError::CompletedNotBool),
    };
    if text.is_none() && completed.is_none() {
        return Err(ValidationError::NoChanges);
    }
    Ok(TodoChanges { text, completed })
}

pub fn validate_id(raw: &str) -> Result<TodoId, ValidationError> {
    raw.parse().map_err(|_| ValidationError::InvalidId)
}
