//! Field schemas for request and response payloads.
//!
//! A [`Schema`] is an ordered set of per-field rules checked against untyped
//! JSON objects. Values arriving as strings (query parameters) are coerced to
//! the declared type where the conversion is unambiguous; unknown fields pass
//! through untouched.
//!
//! # Example
//!
//! ```rust
//! use crudkit::schema::{FieldRule, Schema};
//!
//! let schema = Schema::new()
//!     .field("name", FieldRule::string().required().min_length(1))
//!     .field("quantity", FieldRule::integer().minimum(0.0));
//! ```

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// What a validation error was caused by. `Missing` is the only kind that
/// partial-mode validation discards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Missing,
    Type,
    Length,
    Range,
    Pattern,
}

/// Validation error with field name and message.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// What kind of rule was violated
    pub kind: ViolationKind,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Drop `Missing` violations, keeping everything else.
    pub fn discard_missing(&mut self) {
        self.errors.retain(|e| e.kind != ViolationKind::Missing);
    }

    /// Convert to a `Result`.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Uuid,
}

/// Per-field validation rule. Built with the `FieldRule::string()` family of
/// constructors and chained setters.
#[derive(Debug, Clone)]
pub struct FieldRule {
    ty: FieldType,
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    pattern: Option<Regex>,
}

impl FieldRule {
    fn of(ty: FieldType) -> Self {
        Self {
            ty,
            required: false,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            pattern: None,
        }
    }

    #[must_use]
    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::of(FieldType::Integer)
    }

    #[must_use]
    pub fn float() -> Self {
        Self::of(FieldType::Float)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    #[must_use]
    pub fn uuid() -> Self {
        Self::of(FieldType::Uuid)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    #[must_use]
    pub fn minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    #[must_use]
    pub fn maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }

    /// Require string values to match `pattern`. The caller compiles the
    /// regex, so an invalid pattern fails at construction, not per request.
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Check `value` against this rule, returning the (possibly coerced)
    /// normalized value.
    fn check(&self, field: &str, value: &Value) -> Result<Value, ValidationError> {
        let normalized = self.coerce(field, value)?;
        match self.ty {
            FieldType::String => {
                // coerce guarantees a string here
                if let Some(s) = normalized.as_str() {
                    self.check_length(field, s)?;
                    self.check_pattern(field, s)?;
                }
            }
            FieldType::Integer | FieldType::Float => {
                if let Some(n) = normalized.as_f64() {
                    self.check_range(field, n)?;
                }
            }
            FieldType::Boolean | FieldType::Uuid => {}
        }
        Ok(normalized)
    }

    /// Type check with string coercion: query parameters always arrive as
    /// strings, so "5" satisfies an integer field and is normalized to 5.
    fn coerce(&self, field: &str, value: &Value) -> Result<Value, ValidationError> {
        let type_error = |expected: &str| {
            ValidationError::new(field, ViolationKind::Type, format!("expected {expected}"))
        };
        match self.ty {
            FieldType::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(type_error("a string")),
            },
            FieldType::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                Value::String(s) => s
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| type_error("an integer")),
                _ => Err(type_error("an integer")),
            },
            FieldType::Float => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => s
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| type_error("a number")),
                _ => Err(type_error("a number")),
            },
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) if s == "true" => Ok(Value::Bool(true)),
                Value::String(s) if s == "false" => Ok(Value::Bool(false)),
                _ => Err(type_error("a boolean")),
            },
            FieldType::Uuid => match value {
                Value::String(s) => uuid::Uuid::parse_str(s)
                    .map(|u| Value::String(u.to_string()))
                    .map_err(|_| type_error("a UUID")),
                _ => Err(type_error("a UUID")),
            },
        }
    }

    fn check_length(&self, field: &str, s: &str) -> Result<(), ValidationError> {
        if let Some(min) = self.min_length {
            if s.chars().count() < min {
                return Err(ValidationError::new(
                    field,
                    ViolationKind::Length,
                    format!("must be at least {min} characters"),
                ));
            }
        }
        if let Some(max) = self.max_length {
            if s.chars().count() > max {
                return Err(ValidationError::new(
                    field,
                    ViolationKind::Length,
                    format!("must be at most {max} characters"),
                ));
            }
        }
        Ok(())
    }

    fn check_range(&self, field: &str, n: f64) -> Result<(), ValidationError> {
        if let Some(min) = self.minimum {
            if n < min {
                return Err(ValidationError::new(
                    field,
                    ViolationKind::Range,
                    format!("must be at least {min}"),
                ));
            }
        }
        if let Some(max) = self.maximum {
            if n > max {
                return Err(ValidationError::new(
                    field,
                    ViolationKind::Range,
                    format!("must be at most {max}"),
                ));
            }
        }
        Ok(())
    }

    fn check_pattern(&self, field: &str, s: &str) -> Result<(), ValidationError> {
        if let Some(re) = &self.pattern {
            if !re.is_match(s) {
                return Err(ValidationError::new(
                    field,
                    ViolationKind::Pattern,
                    "does not match the required pattern",
                ));
            }
        }
        Ok(())
    }
}

/// Ordered set of field rules for one payload shape.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.push((name.into(), rule));
        self
    }

    /// Validate `data` against this schema, returning a normalized copy.
    ///
    /// An explicit `null` on a required field counts as missing. In partial
    /// mode, missing-field violations are discarded before deciding whether
    /// to fail; if other violations remain they are surfaced alone.
    ///
    /// # Errors
    ///
    /// Returns every violated field when validation fails.
    pub fn validate(
        &self,
        data: &Map<String, Value>,
        partial: bool,
    ) -> Result<Map<String, Value>, ValidationErrors> {
        let mut normalized = data.clone();
        let mut errors = ValidationErrors::new();

        for (name, rule) in &self.fields {
            match data.get(name) {
                None | Some(Value::Null) => {
                    if rule.required {
                        errors.add(ValidationError::new(
                            name,
                            ViolationKind::Missing,
                            "this field is required",
                        ));
                    }
                }
                Some(value) => match rule.check(name, value) {
                    Ok(value) => {
                        normalized.insert(name.clone(), value);
                    }
                    Err(error) => errors.add(error),
                },
            }
        }

        if partial {
            errors.discard_missing();
        }
        errors.result()?;
        Ok(normalized)
    }
}
