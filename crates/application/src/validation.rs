//! Input validation
//!
//! `validator` derives cover the field rules; [`Validatable`] lets an input add
//! the cross-field rules a derive cannot express and report everything as one
//! [`ValidationResult`].

use crate::ApplicationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validation result containing all errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Field-level errors, keyed by field path (`items[1].quantity`)
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            valid: true,
            field_errors: BTreeMap::new(),
        }
    }

    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        for (field, errors) in other.field_errors {
            self.field_errors.entry(field).or_default().extend(errors);
        }
    }

    /// Ensure validation passed, returning error if not
    pub fn ensure_valid(&self) -> Result<(), ApplicationError> {
        if self.valid {
            return Ok(());
        }
        let messages: Vec<String> = self
            .field_errors
            .iter()
            .flat_map(|(field, errors)| errors.iter().map(move |e| format!("{}: {}", field, e)))
            .collect();
        Err(ApplicationError::ValidationFailed(messages.join("; ")))
    }
}

/// Trait for validatable types
pub trait Validatable {
    fn validate_all(&self) -> ValidationResult;
}

/// Extension to convert validator errors to our format
pub trait ValidatorExt {
    fn to_validation_result(&self) -> ValidationResult;
}

impl<T: Validate> ValidatorExt for T {
    fn to_validation_result(&self) -> ValidationResult {
        let mut result = ValidationResult::success();
        if let Err(errors) = self.validate() {
            collect_errors(&mut result, "", &errors);
        }
        result
    }
}

fn collect_errors(result: &mut ValidationResult, prefix: &str, errors: &ValidationErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    result.add_field_error(path.clone(), message);
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(result, &path, inner),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(result, &format!("{}[{}]", path, index), inner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Buyer {
        #[validate(email(message = "must be a valid email"))]
        email: String,
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn test_validator_errors_are_collected() {
        let buyer = Buyer {
            email: "nope".to_string(),
            name: String::new(),
        };
        let result = buyer.to_validation_result();

        assert!(!result.valid);
        assert_eq!(result.field_errors["email"], vec!["must be a valid email"]);
        assert_eq!(result.field_errors["name"], vec!["length"]);
        assert!(matches!(
            result.ensure_valid(),
            Err(ApplicationError::ValidationFailed(msg)) if msg.contains("email: must be a valid email")
        ));
    }

    #[test]
    fn test_merge() {
        let mut first = ValidationResult::success();
        let mut second = ValidationResult::success();
        second.add_field_error("items", "at least one item is required");

        first.merge(second);
        assert!(!first.valid);
        assert_eq!(first.field_errors.len(), 1);
        assert!(ValidationResult::success().ensure_valid().is_ok());
    }
}
