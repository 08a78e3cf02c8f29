//! Statutory rules used to split a CTC into components.
//!
//! The proportions and the flat Professional Tax live in one
//! [`StatutoryRules`] value rather than being scattered through the
//! resolver.  Deployments may override the defaults with a JSON file;
//! any field omitted from the file keeps its default.

use crate::error::{SalaryError, SalaryResult};
use crate::models::Money;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatutoryRules {
    /// Share of the fixed CTC paid as Basic.
    pub basic_ratio: f64,
    /// Share of Basic paid as HRA.
    pub hra_ratio: f64,
    /// Provident Fund rate on Basic, per side.
    pub pf_rate: f64,
    /// Flat annual Professional Tax, independent of CTC.
    pub professional_tax_annual: Money,
    /// Maximum share of CTC that may be variable.
    pub variable_pay_cap_ratio: f64,
}

impl Default for StatutoryRules {
    fn default() -> Self {
        StatutoryRules {
            basic_ratio: 0.5,
            hra_ratio: 0.5,
            pf_rate: 0.12,
            professional_tax_annual: Money::from_units(2_400),
            variable_pay_cap_ratio: 0.5,
        }
    }
}

impl StatutoryRules {
    /// Variable pay cap as a percentage, e.g. `50.0`.
    pub fn variable_pay_cap_percent(&self) -> f64 {
        self.variable_pay_cap_ratio * 100.0
    }

    pub fn validate(&self) -> SalaryResult<()> {
        let ratios = [
            ("basicRatio", self.basic_ratio),
            ("hraRatio", self.hra_ratio),
            ("pfRate", self.pf_rate),
            ("variablePayCapRatio", self.variable_pay_cap_ratio),
        ];
        for (name, ratio) in ratios {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(SalaryError::Rules(format!(
                    "{name} must be between 0 and 1, got {ratio}"
                )));
            }
        }
        if self.professional_tax_annual.is_negative() {
            return Err(SalaryError::Rules(
                "professionalTaxAnnual cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate rules from a JSON document.
    pub fn from_json(data: &str) -> SalaryResult<Self> {
        let rules: StatutoryRules = serde_json::from_str(data)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load rules from a JSON file on disk.
    pub fn load_from_file(path: &Path) -> SalaryResult<Self> {
        let data = std::fs::read_to_string(path)?;
        let rules = Self::from_json(&data)?;
        info!(path = %path.display(), ?rules, "loaded statutory rules");
        Ok(rules)
    }
}
