//! Declarative rule engine
//!
//! A [`RuleSet`] maps field names to [`ValidationRule`]s. [`validate`] walks
//! the rules in insertion order and collects every field-level failure into
//! a [`ValidationResult`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validators::{
    format_number, is_present, is_valid_email, is_valid_number, is_valid_password,
    is_valid_string, DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH,
};

/// Predicate over the raw field value
pub type CustomValidator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Email,
    Password,
}

/// Constraints for a single field.
///
/// Built with the chaining constructors and immutable afterwards:
///
/// ```ignore
/// ValidationRule::required().string().min_length(3).max_length(50)
/// ```
#[derive(Clone, Default)]
pub struct ValidationRule {
    required: bool,
    required_message: Option<String>,
    field_type: Option<FieldType>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
    message: Option<String>,
    custom: Option<CustomValidator>,
}

impl ValidationRule {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn optional() -> Self {
        Self::default()
    }

    pub fn of_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn string(self) -> Self {
        self.of_type(FieldType::String)
    }

    pub fn number(self) -> Self {
        self.of_type(FieldType::Number)
    }

    pub fn email(self) -> Self {
        self.of_type(FieldType::Email)
    }

    pub fn password(self) -> Self {
        self.of_type(FieldType::Password)
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Replaces the default message of every non-REQUIRED failure.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn required_message(mut self, message: impl Into<String>) -> Self {
        self.required_message = Some(message.into());
        self
    }

    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(predicate));
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }

    fn message_or(&self, default: impl FnOnce() -> String) -> String {
        self.message.clone().unwrap_or_else(default)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("required", &self.required)
            .field("required_message", &self.required_message)
            .field("field_type", &self.field_type)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("message", &self.message)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Ordered field-name → rule mapping
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(String, ValidationRule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule for `field`. Re-adding a field replaces its rule in place.
    pub fn field(mut self, field: impl Into<String>, rule: ValidationRule) -> Self {
        let field = field.into();
        match self.rules.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = rule,
            None => self.rules.push((field, rule)),
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&ValidationRule> {
        self.rules
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValidationRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    Required,
    InvalidEmail,
    InvalidPassword,
    InvalidString,
    InvalidNumber,
    CustomValidationFailed,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::Required => "REQUIRED",
            ValidationCode::InvalidEmail => "INVALID_EMAIL",
            ValidationCode::InvalidPassword => "INVALID_PASSWORD",
            ValidationCode::InvalidString => "INVALID_STRING",
            ValidationCode::InvalidNumber => "INVALID_NUMBER",
            ValidationCode::CustomValidationFailed => "CUSTOM_VALIDATION_FAILED",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: ValidationCode,
}

impl ValidationError {
    fn new(field: &str, message: String, code: ValidationCode) -> Self {
        Self {
            field: field.to_string(),
            message,
            code,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

/// Check `record` against `rules`.
///
/// A record that is not a JSON object is treated as having no fields. Only a
/// REQUIRED failure stops the remaining checks of its field; type and custom
/// failures accumulate. A panicking custom predicate is not caught.
pub fn validate(record: &Value, rules: &RuleSet) -> ValidationResult {
    let mut errors = Vec::new();

    for (field, rule) in rules.iter() {
        let value = record.get(field).filter(|v| is_present(v));

        let Some(value) = value else {
            if rule.required {
                let message = rule
                    .required_message
                    .clone()
                    .unwrap_or_else(|| format!("{field} is required"));
                errors.push(ValidationError::new(field, message, ValidationCode::Required));
            }
            continue;
        };

        if let Some(field_type) = rule.field_type {
            if let Some(error) = check_type(field, value, field_type, rule) {
                errors.push(error);
            }
        }

        if let Some(custom) = &rule.custom {
            if !custom(value) {
                let message = rule.message_or(|| format!("{field} is invalid"));
                errors.push(ValidationError::new(
                    field,
                    message,
                    ValidationCode::CustomValidationFailed,
                ));
            }
        }
    }

    ValidationResult { errors }
}

fn check_type(
    field: &str,
    value: &Value,
    field_type: FieldType,
    rule: &ValidationRule,
) -> Option<ValidationError> {
    match field_type {
        FieldType::Email => (!is_valid_email(value)).then(|| {
            ValidationError::new(
                field,
                rule.message_or(|| "Invalid email format".to_string()),
                ValidationCode::InvalidEmail,
            )
        }),
        FieldType::Password => (!is_valid_password(value)).then(|| {
            ValidationError::new(
                field,
                rule.message_or(|| {
                    "Password must be at least 8 characters with letters and numbers".to_string()
                }),
                ValidationCode::InvalidPassword,
            )
        }),
        FieldType::String => {
            let min = rule.min_length.unwrap_or(DEFAULT_MIN_LENGTH);
            let max = rule.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
            (!is_valid_string(value, min, max)).then(|| {
                ValidationError::new(
                    field,
                    rule.message_or(|| {
                        format!("{field} must be between {min} and {max} characters")
                    }),
                    ValidationCode::InvalidString,
                )
            })
        }
        FieldType::Number => (!is_valid_number(value, rule.min, rule.max)).then(|| {
            ValidationError::new(
                field,
                rule.message_or(|| {
                    let mut message = format!("{field} must be a number");
                    if let Some(min) = rule.min {
                        message.push_str(&format!(" >= {}", format_number(min)));
                    }
                    if let Some(max) = rule.max {
                        message.push_str(&format!(" <= {}", format_number(max)));
                    }
                    message
                }),
                ValidationCode::InvalidNumber,
            )
        }),
    }
}
