//! Submit-time validation.
//!
//! Validators run before any network call.  They never clamp or correct
//! a value: every violation is recorded against its field in a
//! [`ValidationReport`] and the operation is rejected.

use crate::error::{ValidationError, ValidationReport};
use crate::models::{AnnualComponents, CompensationInput, GuidedInput, ManualInput, Money, VariablePayType};
use crate::statutory::StatutoryRules;

pub const MIN_WORKING_DAYS: i64 = 1;
pub const MAX_WORKING_DAYS: i64 = 31;

fn too_large(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: Money::MAX_INPUT.units(),
    }
}

pub fn validate_employee(employee_id: Option<&str>, report: &mut ValidationReport) {
    if employee_id.map_or(true, |id| id.trim().is_empty()) {
        report.push(
            "employeeId",
            ValidationError::Required {
                field: "employee".to_string(),
            },
        );
    }
}

/// CTC must be present (non-zero), non-negative and at most
/// [`Money::MAX_INPUT`].
pub fn validate_ctc(annual_ctc: Money, report: &mut ValidationReport) {
    if annual_ctc > Money::MAX_INPUT {
        report.push("annualCtc", too_large("CTC"));
    } else if annual_ctc.is_negative() {
        report.push(
            "annualCtc",
            ValidationError::Negative {
                field: "CTC".to_string(),
            },
        );
    } else if annual_ctc.is_zero() {
        report.push(
            "annualCtc",
            ValidationError::Required {
                field: "CTC".to_string(),
            },
        );
    }
}

pub fn validate_working_days(days: i64, report: &mut ValidationReport) {
    if !(MIN_WORKING_DAYS..=MAX_WORKING_DAYS).contains(&days) {
        report.push(
            "workingDaysPerMonth",
            ValidationError::OutOfRange {
                field: "working days per month".to_string(),
                min: MIN_WORKING_DAYS,
                max: MAX_WORKING_DAYS,
            },
        );
    }
}

/// Variable pay may not exceed the cap, whether expressed as a
/// percentage or as a fixed annual amount.
pub fn validate_variable_pay(input: &GuidedInput, rules: &StatutoryRules, report: &mut ValidationReport) {
    let policy = input.variable_pay;
    if policy.value < 0.0 {
        report.push(
            "variablePayValue",
            ValidationError::Negative {
                field: "variable pay".to_string(),
            },
        );
        return;
    }
    let over_cap = match policy.kind {
        VariablePayType::None => false,
        VariablePayType::Percentage => policy.value > rules.variable_pay_cap_percent(),
        VariablePayType::Fixed => {
            policy.value > input.annual_ctc.as_f64() * rules.variable_pay_cap_ratio
        }
    };
    if over_cap {
        report.push(
            "variablePayValue",
            ValidationError::VariablePayCap {
                cap_percent: rules.variable_pay_cap_percent(),
            },
        );
    }
}

/// Every component must be non-negative, bounded, and at least one
/// must be set.
pub fn validate_components(components: &AnnualComponents, report: &mut ValidationReport) {
    let amounts = components.named_amounts();
    for (field, amount) in amounts {
        if amount.is_negative() {
            report.push(
                field,
                ValidationError::Negative {
                    field: field.to_string(),
                },
            );
        } else if amount > Money::MAX_INPUT {
            report.push(field, too_large(field));
        }
    }
    if amounts.iter().all(|(_, amount)| amount.is_zero()) {
        report.push("components", ValidationError::NoComponents);
    }
}

pub fn validate_guided(input: &GuidedInput, rules: &StatutoryRules, report: &mut ValidationReport) {
    validate_ctc(input.annual_ctc, report);
    validate_variable_pay(input, rules, report);
    validate_working_days(input.working_days_per_month, report);
}

pub fn validate_manual(input: &ManualInput, report: &mut ValidationReport) {
    validate_components(&input.components, report);
    if let Some(ctc) = input.annual_ctc {
        if ctc.is_negative() {
            report.push(
                "annualCtc",
                ValidationError::Negative {
                    field: "CTC".to_string(),
                },
            );
        } else if ctc > Money::MAX_INPUT {
            report.push("annualCtc", too_large("CTC"));
        }
    }
    validate_working_days(input.components.working_days_per_month, report);
}

/// Validate a complete input, independent of who it belongs to.
pub fn validate_input(input: &CompensationInput, rules: &StatutoryRules) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();
    match input {
        CompensationInput::Guided(guided) => validate_guided(guided, rules, &mut report),
        CompensationInput::Manual(manual) => validate_manual(manual, &mut report),
    }
    report.into_result()
}
