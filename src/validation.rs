use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Checks a required text value; `max_chars` of `None` means unbounded.
pub fn check_text(field: &str, value: &str, max_chars: Option<usize>, errors: &mut Vec<FieldError>) {
    let length = value.chars().count();
    if length == 0 {
        errors.push(FieldError::new(field, "must not be empty"));
        return;
    }
    if let Some(max) = max_chars {
        if length > max {
            errors.push(FieldError::new(
                field,
                format!("must be at most {} characters (got {})", max, length),
            ));
        }
    }
}

pub fn require<T>(field: &str, value: Option<T>, errors: &mut Vec<FieldError>) -> Option<T> {
    if value.is_none() {
        errors.push(FieldError::new(field, "field is required"));
    }
    value
}
