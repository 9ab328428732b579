//! Field-by-field validation of JSON request bodies.
//!
//! Request schemas read their fields in declaration order and stop at the
//! first failure, which becomes the `{ message, field }` body of a 400.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::UnknownVariant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub message: String,
    pub field: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl std::error::Error for FieldError {}

/// Borrowed view over the top-level object of a request body.
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn from_body(body: &'a Value) -> Result<Self, FieldError> {
        match body {
            Value::Object(map) => Ok(Self { map }),
            other => Err(FieldError::new(
                "",
                format!("Expected object, received {}", type_name(other)),
            )),
        }
    }

    /// `None` when the key is absent, `Some(Value::Null)` when explicitly null.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field)
    }

    pub fn required_string(&self, field: &str, max_len: usize) -> Result<String, FieldError> {
        match self.get(field) {
            None => Err(FieldError::new(field, "Required")),
            Some(value) => string_value(field, value, max_len),
        }
    }

    /// Absent keys are `None`; present keys must hold a valid string.
    pub fn optional_string(&self, field: &str, max_len: usize) -> Result<Option<String>, FieldError> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => string_value(field, value, max_len).map(Some),
        }
    }

    /// Absent and null both read as `None`.
    pub fn nullable_string(&self, field: &str, max_len: usize) -> Result<Option<String>, FieldError> {
        Ok(self.patch_nullable_string(field, max_len)?.flatten())
    }

    /// Distinguishes an absent key (`None`) from an explicit null (`Some(None)`),
    /// which partial updates use to clear a column.
    pub fn patch_nullable_string(
        &self,
        field: &str,
        max_len: usize,
    ) -> Result<Option<Option<String>>, FieldError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(value) => string_value(field, value, max_len).map(|s| Some(Some(s))),
        }
    }

    pub fn required_int(&self, field: &str, min: i64) -> Result<i64, FieldError> {
        match self.get(field) {
            None => Err(FieldError::new(field, "Required")),
            Some(value) => int_value(field, value, min),
        }
    }

    pub fn optional_int(&self, field: &str, min: i64) -> Result<Option<i64>, FieldError> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => int_value(field, value, min).map(Some),
        }
    }

    pub fn optional_enum<T>(&self, field: &str) -> Result<Option<T>, FieldError>
    where
        T: FromStr<Err = UnknownVariant>,
    {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => s
                .parse::<T>()
                .map(Some)
                .map_err(|e| FieldError::new(field, e.to_string())),
            Some(other) => Err(FieldError::new(
                field,
                format!("Expected string, received {}", type_name(other)),
            )),
        }
    }
}

fn string_value(field: &str, value: &Value, max_len: usize) -> Result<String, FieldError> {
    let s = match value {
        Value::String(s) => s,
        other => {
            return Err(FieldError::new(
                field,
                format!("Expected string, received {}", type_name(other)),
            ));
        }
    };

    // Whitespace-only counts as empty; the value itself is kept as sent.
    if s.trim().is_empty() {
        return Err(FieldError::new(
            field,
            "String must contain at least 1 character(s)",
        ));
    }
    if s.chars().count() > max_len {
        return Err(FieldError::new(
            field,
            format!("String must contain at most {} character(s)", max_len),
        ));
    }

    Ok(s.clone())
}

fn int_value(field: &str, value: &Value, min: i64) -> Result<i64, FieldError> {
    let n = match value {
        Value::Number(n) => n,
        other => {
            return Err(FieldError::new(
                field,
                format!("Expected number, received {}", type_name(other)),
            ));
        }
    };

    let int = match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => i,
        (None, Some(f)) if f.fract() != 0.0 => {
            return Err(FieldError::new(field, "Expected integer, received float"));
        }
        // Whole floats such as `2.0` are accepted as integers.
        (None, Some(f)) if f >= i64::MIN as f64 && f < i64::MAX as f64 => f as i64,
        _ => return Err(FieldError::new(field, "Number is out of range")),
    };

    if int < min {
        return Err(FieldError::new(
            field,
            format!("Number must be greater than or equal to {}", min),
        ));
    }

    Ok(int)
}

/// Media links are either absolute http(s) URLs or object-store paths.
pub fn check_media_url(field: &str, url: &str) -> Result<(), FieldError> {
    if url.chars().any(char::is_whitespace) {
        return Err(FieldError::new(field, "Invalid url"));
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("/objects/"));

    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
        _ => Err(FieldError::new(field, "Invalid url")),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
