//! Remote preview calculator client.
//!
//! The remote calculator is authoritative but loosely specified: the
//! same concept may come back as `basic`, `basic_salary`, `monthlyBasic`
//! or `annual_basic`, as a number or a numeric string, wrapped in a
//! `data` envelope or not.  Every response is normalised exactly once,
//! here, through [`ALIASES`]; the resolver only ever sees canonical
//! fields.

use crate::error::PreviewError;
use crate::models::{
    AnnualComponents, BreakdownSource, CompensationBreakdown, GuidedInput, Money, VariablePayType,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Body of a preview call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub annual_ctc: Money,
    pub variable_pay_type: VariablePayType,
    pub variable_pay_value: f64,
}

impl From<&GuidedInput> for PreviewRequest {
    fn from(input: &GuidedInput) -> Self {
        PreviewRequest {
            annual_ctc: input.annual_ctc,
            variable_pay_type: input.variable_pay.kind,
            variable_pay_value: input.variable_pay.value,
        }
    }
}

/// A remote calculator returning an un-normalised JSON breakdown.
#[async_trait]
pub trait PreviewService: Send + Sync {
    async fn preview(&self, request: &PreviewRequest) -> Result<Value, PreviewError>;
}

/// [`PreviewService`] over HTTP: `POST <base>/salary/preview`.
pub struct HttpPreviewClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPreviewClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PreviewError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpPreviewClient {
            client,
            endpoint: format!("{}/salary/preview", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl PreviewService for HttpPreviewClient {
    async fn preview(&self, request: &PreviewRequest) -> Result<Value, PreviewError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Canonical fields a remote breakdown can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Basic,
    Hra,
    SpecialAllowance,
    Conveyance,
    MedicalAllowance,
    OtherAllowance,
    EmployeePf,
    EmployerPf,
    PfTotal,
    ProfessionalTax,
    OtherDeduction,
    VariablePay,
    AnnualCtc,
    Gross,
    Deductions,
    InHand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magnitude {
    Monthly,
    Annual,
}

/// Known external names, normalised to lowercase without separators.
/// The magnitude applies when the key carries no `monthly`/`annual`
/// qualifier of its own.
pub const ALIASES: &[(&str, CanonicalField, Magnitude)] = &[
    ("basic", CanonicalField::Basic, Magnitude::Monthly),
    ("basicsalary", CanonicalField::Basic, Magnitude::Monthly),
    ("basicpay", CanonicalField::Basic, Magnitude::Monthly),
    ("hra", CanonicalField::Hra, Magnitude::Monthly),
    ("houserentallowance", CanonicalField::Hra, Magnitude::Monthly),
    ("special", CanonicalField::SpecialAllowance, Magnitude::Monthly),
    ("specialallowance", CanonicalField::SpecialAllowance, Magnitude::Monthly),
    ("conveyance", CanonicalField::Conveyance, Magnitude::Monthly),
    ("conveyanceallowance", CanonicalField::Conveyance, Magnitude::Monthly),
    ("medical", CanonicalField::MedicalAllowance, Magnitude::Monthly),
    ("medicalallowance", CanonicalField::MedicalAllowance, Magnitude::Monthly),
    ("otherallowance", CanonicalField::OtherAllowance, Magnitude::Monthly),
    ("otherallowances", CanonicalField::OtherAllowance, Magnitude::Monthly),
    ("employeepf", CanonicalField::EmployeePf, Magnitude::Monthly),
    ("pfemployee", CanonicalField::EmployeePf, Magnitude::Monthly),
    ("employerpf", CanonicalField::EmployerPf, Magnitude::Monthly),
    ("pfemployer", CanonicalField::EmployerPf, Magnitude::Monthly),
    ("pf", CanonicalField::PfTotal, Magnitude::Annual),
    ("pftotal", CanonicalField::PfTotal, Magnitude::Annual),
    ("totalpf", CanonicalField::PfTotal, Magnitude::Annual),
    ("providentfund", CanonicalField::PfTotal, Magnitude::Annual),
    ("professionaltax", CanonicalField::ProfessionalTax, Magnitude::Monthly),
    ("proftax", CanonicalField::ProfessionalTax, Magnitude::Monthly),
    ("pt", CanonicalField::ProfessionalTax, Magnitude::Monthly),
    ("otherdeduction", CanonicalField::OtherDeduction, Magnitude::Monthly),
    ("otherdeductions", CanonicalField::OtherDeduction, Magnitude::Monthly),
    ("variablepay", CanonicalField::VariablePay, Magnitude::Annual),
    ("variable", CanonicalField::VariablePay, Magnitude::Annual),
    ("ctc", CanonicalField::AnnualCtc, Magnitude::Annual),
    ("totalctc", CanonicalField::AnnualCtc, Magnitude::Annual),
    ("costtocompany", CanonicalField::AnnualCtc, Magnitude::Annual),
    ("gross", CanonicalField::Gross, Magnitude::Monthly),
    ("grosssalary", CanonicalField::Gross, Magnitude::Monthly),
    ("deductions", CanonicalField::Deductions, Magnitude::Monthly),
    ("totaldeductions", CanonicalField::Deductions, Magnitude::Monthly),
    ("inhand", CanonicalField::InHand, Magnitude::Monthly),
    ("netsalary", CanonicalField::InHand, Magnitude::Monthly),
    ("takehome", CanonicalField::InHand, Magnitude::Monthly),
];

const MONTHLY_QUALIFIERS: &[&str] = &["monthly", "permonth"];
const ANNUAL_QUALIFIERS: &[&str] = &["annual", "yearly", "perannum"];

/// Resolve an external key to its canonical field and magnitude.
pub fn resolve_alias(key: &str) -> Option<(CanonicalField, Magnitude)> {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    let lookup = |stem: &str| {
        ALIASES
            .iter()
            .find(|(alias, _, _)| *alias == stem)
            .map(|(_, field, magnitude)| (*field, *magnitude))
    };
    if let Some(found) = lookup(normalized.as_str()) {
        return Some(found);
    }
    let qualified = [
        (MONTHLY_QUALIFIERS, Magnitude::Monthly),
        (ANNUAL_QUALIFIERS, Magnitude::Annual),
    ];
    for (qualifiers, magnitude) in qualified {
        for qualifier in qualifiers {
            let stem = normalized
                .strip_prefix(qualifier)
                .or_else(|| normalized.strip_suffix(qualifier));
            if let Some((field, _)) = stem.and_then(lookup) {
                return Some((field, magnitude));
            }
        }
    }
    None
}

/// Monthly and annual observations of one canonical field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observed {
    pub monthly: Option<f64>,
    pub annual: Option<f64>,
}

impl Observed {
    /// Annual figure, preferring the monthly observation.  An annual
    /// observation that rounds to the same monthly figure is kept as the
    /// more precise value.
    pub fn annual_amount(&self) -> Option<Money> {
        match (self.monthly, self.annual) {
            (Some(monthly), Some(annual)) => {
                let annual = Money::from_rounded(annual);
                if annual.monthly() == Money::from_rounded(monthly) {
                    Some(annual)
                } else {
                    Some(Money::from_rounded(monthly * 12.0))
                }
            }
            (Some(monthly), None) => Some(Money::from_rounded(monthly * 12.0)),
            (None, Some(annual)) => Some(Money::from_rounded(annual)),
            (None, None) => None,
        }
    }
}

/// A remote response reduced to canonical fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewFields {
    fields: HashMap<CanonicalField, Observed>,
}

impl PreviewFields {
    pub fn get(&self, field: CanonicalField) -> Option<Money> {
        self.fields.get(&field).and_then(Observed::annual_amount)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay the remote figures on a locally computed breakdown for
    /// the same input.  Fields the remote omitted keep their local
    /// value.
    pub fn into_breakdown(
        self,
        input: &GuidedInput,
        local: &CompensationBreakdown,
    ) -> CompensationBreakdown {
        let fallback = &local.annual;
        let pick = |field, default: Money| self.get(field).unwrap_or(default);

        let sides = match (self.get(CanonicalField::EmployeePf), self.get(CanonicalField::EmployerPf)) {
            (Some(employee), Some(employer)) => Some(employee + employer),
            (Some(side), None) | (None, Some(side)) => Some(side + side),
            (None, None) => None,
        };
        let per_side_monthly = |total: Money| Money::from_rounded(total.as_f64() / 24.0);
        let pf_total = match (self.get(CanonicalField::PfTotal), sides) {
            // A total that agrees with the per-side figures keeps its precision.
            (Some(total), Some(sides)) if per_side_monthly(total) == per_side_monthly(sides) => total,
            (_, Some(sides)) => sides,
            (Some(total), None) => total,
            (None, None) => fallback.pf_total,
        };
        let annual = AnnualComponents {
            basic: pick(CanonicalField::Basic, fallback.basic),
            hra: pick(CanonicalField::Hra, fallback.hra),
            special_allowance: pick(CanonicalField::SpecialAllowance, fallback.special_allowance),
            conveyance: pick(CanonicalField::Conveyance, fallback.conveyance),
            medical_allowance: pick(CanonicalField::MedicalAllowance, fallback.medical_allowance),
            other_allowance: pick(CanonicalField::OtherAllowance, fallback.other_allowance),
            professional_tax: pick(CanonicalField::ProfessionalTax, fallback.professional_tax),
            other_deduction: pick(CanonicalField::OtherDeduction, fallback.other_deduction),
            pf_total,
            variable_pay: pick(CanonicalField::VariablePay, fallback.variable_pay),
            working_days_per_month: input.working_days_per_month,
        };
        let annual_ctc = pick(CanonicalField::AnnualCtc, input.annual_ctc);
        let breakdown = CompensationBreakdown::from_annual(annual, annual_ctc, BreakdownSource::Remote);

        let reported = [
            (CanonicalField::Gross, breakdown.monthly_gross),
            (CanonicalField::Deductions, breakdown.monthly_deductions),
            (CanonicalField::InHand, breakdown.monthly_in_hand),
        ];
        for (field, derived) in reported {
            if let Some(remote) = self.fields.get(&field).and_then(|o| o.monthly) {
                if Money::from_rounded(remote) != derived {
                    debug!(?field, remote, derived = derived.units(), "remote total disagrees with derived total");
                }
            }
        }
        breakdown
    }
}

/// Strip a `{"data": {...}}` envelope if present.
pub(crate) fn unwrap_envelope(value: &Value) -> Option<&Map<String, Value>> {
    let object = value.as_object()?;
    match object.get("data").and_then(Value::as_object) {
        Some(inner) => Some(inner),
        None => Some(object),
    }
}

fn as_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Map a raw response onto canonical fields.
pub fn normalize(response: &Value) -> Result<PreviewFields, PreviewError> {
    let object = unwrap_envelope(response)
        .ok_or_else(|| PreviewError::Malformed("response is not a JSON object".to_string()))?;
    let mut fields: HashMap<CanonicalField, Observed> = HashMap::new();
    for (key, raw) in object {
        let Some((field, magnitude)) = resolve_alias(key) else {
            debug!(key = %key, "ignoring unknown preview field");
            continue;
        };
        if raw.is_null() {
            continue;
        }
        let amount = as_amount(raw)
            .ok_or_else(|| PreviewError::Malformed(format!("{key} is not numeric: {raw}")))?;
        if !amount.is_finite() || amount < 0.0 || amount > Money::MAX_INPUT.as_f64() {
            return Err(PreviewError::Malformed(format!("{key} is out of range: {amount}")));
        }
        let observed = fields.entry(field).or_default();
        let slot = match magnitude {
            Magnitude::Monthly => &mut observed.monthly,
            Magnitude::Annual => &mut observed.annual,
        };
        slot.get_or_insert(amount);
    }
    if fields.is_empty() {
        return Err(PreviewError::Malformed(
            "response carries no known salary field".to_string(),
        ));
    }
    Ok(PreviewFields { fields })
}
