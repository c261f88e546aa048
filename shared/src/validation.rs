//! Validation utilities for the Restaurant Stock Management Platform
//!
//! Custom validators used by the `validator` derives on input types, plus
//! small checks shared by the backend and the browser.

use rust_decimal::Decimal;
use validator::ValidationError;

// ============================================================================
// Field Validators
// ============================================================================

/// Quantities, prices and thresholds cannot be negative
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut error = ValidationError::new("non_negative");
        error.message = Some("Value cannot be negative".into());
        return Err(error);
    }
    Ok(())
}

/// Recipe quantities must be strictly positive
pub fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.message = Some("Value must be greater than zero".into());
        return Err(error);
    }
    Ok(())
}

// ============================================================================
// Error Formatting
// ============================================================================

/// First failing field of a validation run, with its message
pub fn first_field_error(errors: &validator::ValidationErrors) -> (String, String) {
    for (field, kind) in errors.errors() {
        match kind {
            validator::ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                    return (field.to_string(), message);
                }
            }
            validator::ValidationErrorsKind::Struct(inner) => {
                let (inner_field, message) = first_field_error(inner);
                return (format!("{}.{}", field, inner_field), message);
            }
            validator::ValidationErrorsKind::List(items) => {
                if let Some((index, inner)) = items.iter().next() {
                    let (inner_field, message) = first_field_error(inner);
                    return (format!("{}[{}].{}", field, index, inner_field), message);
                }
            }
        }
    }
    ("input".to_string(), "Invalid input".to_string())
}
