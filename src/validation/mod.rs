//! Validation Module - Declarative request body validation
//!
//! Request bodies arrive as raw JSON and are checked field by field before
//! deserialization, so malformed input turns into a 400 with a field-level
//! error list instead of an opaque decode failure.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Validation result
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { valid: true, errors: vec![] }
    }

    pub fn fail(errors: Vec<ValidationError>) -> Self {
        Self { valid: false, errors }
    }

    pub fn extend(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
            self.errors.extend(other.errors);
        }
    }
}

/// Validation error
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub code: String,
    pub message: String,
}

/// Validation rule
#[derive(Clone, Debug)]
pub enum ValidationRule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    ExactLength(usize),
    Email,
    Digits,
    In(Vec<String>),
}

/// Field validator
pub struct FieldValidator {
    field: String,
    rules: Vec<ValidationRule>,
}

impl FieldValidator {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            rules: vec![],
        }
    }

    pub fn required(mut self) -> Self {
        self.rules.push(ValidationRule::Required);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.rules.push(ValidationRule::MinLength(len));
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.rules.push(ValidationRule::MaxLength(len));
        self
    }

    pub fn exact_length(mut self, len: usize) -> Self {
        self.rules.push(ValidationRule::ExactLength(len));
        self
    }

    pub fn email(mut self) -> Self {
        self.rules.push(ValidationRule::Email);
        self
    }

    pub fn digits(mut self) -> Self {
        self.rules.push(ValidationRule::Digits);
        self
    }

    pub fn one_of(mut self, values: Vec<&str>) -> Self {
        self.rules.push(ValidationRule::In(
            values.into_iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Validate this field inside a JSON object.
    pub fn validate(&self, object: &serde_json::Value) -> ValidationResult {
        let value = object.get(&self.field);
        let mut errors = Vec::new();

        let present = matches!(value, Some(v) if !v.is_null());
        let as_str = value.and_then(|v| v.as_str());

        for rule in &self.rules {
            match rule {
                ValidationRule::Required => {
                    if !present {
                        errors.push(self.error("required", "is required"));
                    }
                }
                // Remaining rules only apply when a string value is present
                ValidationRule::MinLength(len) => {
                    if let Some(s) = as_str {
                        if s.len() < *len {
                            errors.push(self.error(
                                "min_length",
                                &format!("must be at least {} characters", len),
                            ));
                        }
                    }
                }
                ValidationRule::MaxLength(len) => {
                    if let Some(s) = as_str {
                        if s.len() > *len {
                            errors.push(self.error(
                                "max_length",
                                &format!("must be at most {} characters", len),
                            ));
                        }
                    }
                }
                ValidationRule::ExactLength(len) => {
                    if let Some(s) = as_str {
                        if s.len() != *len {
                            errors.push(self.error(
                                "exact_length",
                                &format!("must be exactly {} characters", len),
                            ));
                        }
                    }
                }
                ValidationRule::Email => {
                    if let Some(s) = as_str {
                        let re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
                        if !re.is_match(s) {
                            errors.push(self.error("email", "must be a valid email address"));
                        }
                    }
                }
                ValidationRule::Digits => {
                    if let Some(s) = as_str {
                        if !s.chars().all(|c| c.is_ascii_digit()) {
                            errors.push(self.error("digits", "must contain only digits"));
                        }
                    }
                }
                ValidationRule::In(values) => {
                    if let Some(s) = as_str {
                        if !values.iter().any(|v| v == s) {
                            errors.push(self.error(
                                "one_of",
                                &format!("must be one of: {}", values.join(", ")),
                            ));
                        }
                    }
                }
            }

            // String rules against a present non-string value
            if present && as_str.is_none() && !matches!(rule, ValidationRule::Required) {
                errors.push(self.error("type", "must be a string"));
                break;
            }
        }

        if errors.is_empty() {
            ValidationResult::ok()
        } else {
            ValidationResult::fail(errors)
        }
    }

    fn error(&self, code: &str, message: &str) -> ValidationError {
        ValidationError {
            field: self.field.clone(),
            code: code.to_string(),
            message: format!("{} {}", self.field, message),
        }
    }
}

/// Run a set of field validators against one JSON object.
pub fn validate_object(object: &serde_json::Value, validators: &[FieldValidator]) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if !object.is_object() {
        return ValidationResult::fail(vec![ValidationError {
            field: "".to_string(),
            code: "type".to_string(),
            message: "request body must be a JSON object".to_string(),
        }]);
    }

    for validator in validators {
        result.extend(validator.validate(object));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_and_email() {
        let validators = vec![
            FieldValidator::new("email").required().email(),
            FieldValidator::new("password").required().min_length(6),
        ];

        let ok = validate_object(&json!({"email": "a@b.co", "password": "secret123"}), &validators);
        assert!(ok.valid);

        let bad = validate_object(&json!({"email": "not-an-email", "password": "ab"}), &validators);
        assert!(!bad.valid);
        assert_eq!(bad.errors.len(), 2);

        let missing = validate_object(&json!({}), &validators);
        assert!(!missing.valid);
        assert!(missing.errors.iter().any(|e| e.field == "email" && e.code == "required"));
    }

    #[test]
    fn test_one_of_and_exact_length() {
        let validators = vec![
            FieldValidator::new("gender").one_of(vec!["male", "female", "other"]),
            FieldValidator::new("otp").required().exact_length(6).digits(),
        ];

        let ok = validate_object(&json!({"gender": "female", "otp": "123456"}), &validators);
        assert!(ok.valid);

        // gender is optional: absent is fine
        let no_gender = validate_object(&json!({"otp": "123456"}), &validators);
        assert!(no_gender.valid);

        let bad = validate_object(&json!({"gender": "unknown", "otp": "12x"}), &validators);
        assert!(!bad.valid);
        assert_eq!(bad.errors.len(), 3);
    }

    #[test]
    fn test_non_object_body() {
        let result = validate_object(&json!([1, 2, 3]), &[FieldValidator::new("x").required()]);
        assert!(!result.valid);
    }

    #[test]
    fn test_non_string_value() {
        let validators = vec![FieldValidator::new("firstName").required().min_length(1)];
        let result = validate_object(&json!({"firstName": 42}), &validators);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.code == "type"));
    }
}
