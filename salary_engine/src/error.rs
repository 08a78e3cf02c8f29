//! Error types for the Salary Engine.
//!
//! Three families, each derived with `thiserror`:
//!
//! - [`ValidationError`] / [`ValidationReport`]: submit-time policy
//!   violations, reported per field and never persisted.
//! - [`PreviewError`]: anything that goes wrong talking to the remote
//!   preview calculator.  These never reach the user; the resolver logs
//!   them and falls back to the local formulas.
//! - [`SalaryError`]: everything else a caller can observe, including
//!   persistence rejections carrying the server's message.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// A single rule violation on one input field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} cannot be negative")]
    Negative { field: String },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("variable pay cannot exceed {cap_percent}% of CTC")]
    VariablePayCap { cap_percent: f64 },

    #[error("at least one salary component must be non-zero")]
    NoComponents,
}

/// A validation failure attached to the field that caused it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Error)]
#[error("{}", self.summary())]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn push(&mut self, field: &str, error: ValidationError) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: error.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    /// One-line notification text listing every failing field.
    pub fn summary(&self) -> String {
        match self.errors.as_slice() {
            [] => "no validation errors".to_string(),
            [only] => only.message.clone(),
            many => {
                let messages: Vec<&str> = many.iter().map(|e| e.message.as_str()).collect();
                format!("{} fields need attention: {}", many.len(), messages.join("; "))
            }
        }
    }

    /// `Ok(())` when nothing was reported.
    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Failures of the remote preview calculator.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("preview request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("preview request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("malformed preview response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum SalaryError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationReport),

    /// The persistence service rejected a create or update.  `field` is
    /// set when the server message points at a specific input.
    #[error("salary service rejected the request: {message}")]
    Persistence {
        message: String,
        field: Option<String>,
    },

    #[error("salary service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid statutory rules: {0}")]
    Rules(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type SalaryResult<T> = Result<T, SalaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_pay_cap_message_mentions_the_cap() {
        let err = ValidationError::VariablePayCap { cap_percent: 50.0 };
        assert_eq!(err.to_string(), "variable pay cannot exceed 50% of CTC");
    }

    #[test]
    fn report_summary_lists_every_field() {
        let mut report = ValidationReport::default();
        report.push(
            "employeeId",
            ValidationError::Required {
                field: "employee".into(),
            },
        );
        assert_eq!(report.summary(), "employee is required");

        report.push(
            "workingDaysPerMonth",
            ValidationError::OutOfRange {
                field: "working days per month".into(),
                min: 1,
                max: 31,
            },
        );
        assert_eq!(
            report.summary(),
            "2 fields need attention: employee is required; working days per month must be between 1 and 31"
        );
        assert!(report.for_field("workingDaysPerMonth").is_some());
    }

    #[test]
    fn report_converts_into_salary_error() {
        let mut report = ValidationReport::default();
        report.push("annualCtc", ValidationError::Negative { field: "CTC".into() });
        let err: SalaryError = report.into();
        assert!(matches!(err, SalaryError::Validation(_)));
    }
}
