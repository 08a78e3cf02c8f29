//! Salary register computation.
//!
//! The `engine` module resolves salary structures for many employees at
//! once, e.g. to export a payroll register.  Entries are validated and
//! resolved locally in parallel with [`rayon`]; an invalid entry is
//! reported alongside the others instead of failing the whole run.

use crate::error::ValidationReport;
use crate::models::{CompensationBreakdown, CompensationInput, Money};
use crate::resolver::{resolve_from_components, resolve_from_ctc};
use crate::statutory::StatutoryRules;
use crate::validation::validate_input;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One employee's policy in a register run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEntry {
    pub employee_id: String,
    #[serde(flatten)]
    pub input: CompensationInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterLine {
    pub employee_id: String,
    pub breakdown: CompensationBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFailure {
    pub employee_id: String,
    pub errors: ValidationReport,
}

/// Monthly totals across every resolved line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTotals {
    pub monthly_gross: Money,
    pub monthly_deductions: Money,
    pub monthly_in_hand: Money,
    pub employer_pf: Money,
    pub annual_ctc: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRegister {
    pub lines: Vec<RegisterLine>,
    pub failures: Vec<RegisterFailure>,
    pub totals: RegisterTotals,
}

/// Resolve a single entry without touching the network.
pub fn resolve_entry(
    entry: &RegisterEntry,
    rules: &StatutoryRules,
) -> Result<CompensationBreakdown, ValidationReport> {
    validate_input(&entry.input, rules)?;
    Ok(match &entry.input {
        CompensationInput::Guided(guided) => resolve_from_ctc(guided, rules),
        CompensationInput::Manual(manual) => {
            resolve_from_components(&manual.components, manual.annual_ctc)
        }
    })
}

/// Builds the register for `entries`, preserving their order.
pub fn build_register(entries: Vec<RegisterEntry>, rules: &StatutoryRules) -> SalaryRegister {
    let resolved: Vec<(String, Result<CompensationBreakdown, ValidationReport>)> = entries
        .into_par_iter()
        .map(|entry| {
            let outcome = resolve_entry(&entry, rules);
            (entry.employee_id, outcome)
        })
        .collect();

    let mut lines = Vec::new();
    let mut failures = Vec::new();
    let mut totals = RegisterTotals::default();
    for (employee_id, outcome) in resolved {
        match outcome {
            Ok(breakdown) => {
                totals.monthly_gross += breakdown.monthly_gross;
                totals.monthly_deductions += breakdown.monthly_deductions;
                totals.monthly_in_hand += breakdown.monthly_in_hand;
                totals.employer_pf += breakdown.monthly.employer_pf;
                totals.annual_ctc += breakdown.annual_ctc;
                lines.push(RegisterLine {
                    employee_id,
                    breakdown,
                });
            }
            Err(errors) => failures.push(RegisterFailure { employee_id, errors }),
        }
    }
    info!(
        resolved = lines.len(),
        failed = failures.len(),
        monthly_gross = totals.monthly_gross.units(),
        "salary register built"
    );
    SalaryRegister {
        lines,
        failures,
        totals,
    }
}
