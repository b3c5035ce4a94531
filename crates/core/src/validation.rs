//! Input validation: field-level violation collection.
//!
//! Request DTOs derive [`validator::Validate`]; [`validate_input`] runs
//! the derive-generated checks and converts the result into
//! [`Violations`], which enumerates *every* violated field. Cross-field
//! rules that the derive cannot express (self-loops, catalog lookups)
//! are pushed onto a [`Violations`] accumulator by the caller.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::CoreError;

/// A single field-level rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field path, e.g. `"name"` or `"position.x"`.
    pub field: String,
    /// Machine-readable rule code, e.g. `"length"` or `"range"`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Violations(pub Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A `Violations` holding exactly one entry with code `"invalid"`.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut v = Self::new();
        v.push(field, "invalid", message);
        v
    }

    pub fn push(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.0.push(FieldViolation {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the accumulator: `Err(CoreError::Validation)` if anything
    /// was collected, `Ok(())` otherwise.
    pub fn into_result(self) -> Result<(), CoreError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(self))
        }
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "validation failed");
        }
        let joined = self
            .0
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}")
    }
}

impl From<ValidationErrors> for Violations {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Violations::new();
        collect(String::new(), &errors, &mut out);
        out
    }
}

/// Flatten a (possibly nested) `ValidationErrors` tree into dotted
/// field paths.
fn collect(prefix: String, errors: &ValidationErrors, out: &mut Violations) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed rule '{}'", err.code));
                    out.push(path.clone(), err.code.to_string(), message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(format!("{path}[{index}]"), nested, out);
                }
            }
        }
    }
}

/// Run the derive-generated checks on `input`, collecting every
/// violation into one `CoreError::Validation`.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    match input.validate() {
        Ok(()) => Ok(()),
        Err(errors) => Err(CoreError::Validation(errors.into())),
    }
}
