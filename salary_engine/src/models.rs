//! Data models for the Salary Engine.
//!
//! The `models` module defines the serialisable types that flow through
//! the resolver: the two input variants (guided CTC policy and manually
//! entered annual components), the derived monthly view, and the
//! resulting breakdown.  Annual figures are canonical; monthly figures
//! are always derived from them and never stored independently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Default number of working days used when an input omits the field.
pub const DEFAULT_WORKING_DAYS: i64 = 26;

fn default_working_days() -> i64 {
    DEFAULT_WORKING_DAYS
}

/// A monetary amount in whole currency units (rupees).
///
/// Sub-unit precision is never retained: computations run in `f64` and
/// each field is rounded exactly once through [`Money::from_rounded`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Largest amount any single input field may carry: ₹1 lakh crore.
    /// Sums and annualised totals of bounded fields stay far inside `i64`.
    pub const MAX_INPUT: Money = Money(1_000_000_000_000);

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Rounds a full-precision amount to whole units, half away from zero.
    pub fn from_rounded(amount: f64) -> Self {
        Money(amount.round() as i64)
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    /// Per-field monthly figure: `round(annual / 12)`.
    pub fn monthly(&self) -> Self {
        Money::from_rounded(self.as_f64() / 12.0)
    }

    pub fn annualized(&self) -> Self {
        Money(self.0.saturating_mul(12))
    }

    /// True when the amount lies within `0..=MAX_INPUT`.
    pub fn within_input_bounds(&self) -> bool {
        (0..=Money::MAX_INPUT.0).contains(&self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

/// Formats as whole rupees with Indian digit grouping, e.g. `₹12,00,000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let sign = if self.0 < 0 { "-" } else { "" };
        if digits.len() <= 3 {
            return write!(f, "{sign}₹{digits}");
        }
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups = Vec::new();
        let mut end = head.len();
        while end > 2 {
            groups.push(&head[end - 2..end]);
            end -= 2;
        }
        groups.push(&head[..end]);
        groups.reverse();
        write!(f, "{sign}₹{},{tail}", groups.join(","))
    }
}

/// How variable pay is expressed in a guided policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariablePayType {
    #[default]
    None,
    /// `value` is a percentage of annual CTC.
    Percentage,
    /// `value` is an absolute annual amount.
    Fixed,
}

impl fmt::Display for VariablePayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariablePayType::None => "none",
            VariablePayType::Percentage => "percentage",
            VariablePayType::Fixed => "fixed",
        };
        f.write_str(name)
    }
}

/// Variable pay policy: a kind plus its percentage or fixed amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablePayPolicy {
    #[serde(rename = "variablePayType", default)]
    pub kind: VariablePayType,
    #[serde(rename = "variablePayValue", default)]
    pub value: f64,
}

impl VariablePayPolicy {
    pub const NONE: VariablePayPolicy = VariablePayPolicy {
        kind: VariablePayType::None,
        value: 0.0,
    };

    pub fn percentage(value: f64) -> Self {
        VariablePayPolicy {
            kind: VariablePayType::Percentage,
            value,
        }
    }

    pub fn fixed(value: f64) -> Self {
        VariablePayPolicy {
            kind: VariablePayType::Fixed,
            value,
        }
    }

    /// Annual variable pay at full precision for the given CTC.
    pub fn annual_amount(&self, annual_ctc: Money) -> f64 {
        match self.kind {
            VariablePayType::None => 0.0,
            VariablePayType::Percentage => annual_ctc.as_f64() * self.value / 100.0,
            VariablePayType::Fixed => self.value,
        }
    }
}

/// Guided entry: CTC and variable-pay policy drive every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidedInput {
    pub annual_ctc: Money,
    #[serde(flatten)]
    pub variable_pay: VariablePayPolicy,
    #[serde(default = "default_working_days")]
    pub working_days_per_month: i64,
}

impl GuidedInput {
    pub fn new(annual_ctc: Money, variable_pay: VariablePayPolicy) -> Self {
        GuidedInput {
            annual_ctc,
            variable_pay,
            working_days_per_month: DEFAULT_WORKING_DAYS,
        }
    }
}

impl Default for GuidedInput {
    fn default() -> Self {
        GuidedInput::new(Money::zero(), VariablePayPolicy::NONE)
    }
}

/// The annual component set.  This is both the manual-entry form and
/// the canonical representation inside every breakdown.
///
/// `pf_total` is the combined employee and employer Provident Fund; each
/// side is half of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualComponents {
    #[serde(rename = "basicAnnual", default)]
    pub basic: Money,
    #[serde(rename = "hraAnnual", default)]
    pub hra: Money,
    #[serde(rename = "specialAllowanceAnnual", default)]
    pub special_allowance: Money,
    #[serde(rename = "conveyanceAnnual", default)]
    pub conveyance: Money,
    #[serde(rename = "medicalAllowanceAnnual", default)]
    pub medical_allowance: Money,
    #[serde(rename = "otherAllowanceAnnual", default)]
    pub other_allowance: Money,
    #[serde(rename = "professionalTaxAnnual", default)]
    pub professional_tax: Money,
    #[serde(rename = "otherDeductionAnnual", default)]
    pub other_deduction: Money,
    #[serde(rename = "pfAnnual", default)]
    pub pf_total: Money,
    #[serde(rename = "variablePayAnnual", default)]
    pub variable_pay: Money,
    #[serde(rename = "workingDaysPerMonth", default = "default_working_days")]
    pub working_days_per_month: i64,
}

impl Default for AnnualComponents {
    fn default() -> Self {
        AnnualComponents {
            basic: Money::zero(),
            hra: Money::zero(),
            special_allowance: Money::zero(),
            conveyance: Money::zero(),
            medical_allowance: Money::zero(),
            other_allowance: Money::zero(),
            professional_tax: Money::zero(),
            other_deduction: Money::zero(),
            pf_total: Money::zero(),
            variable_pay: Money::zero(),
            working_days_per_month: DEFAULT_WORKING_DAYS,
        }
    }
}

impl AnnualComponents {
    /// Every monetary field with its wire name, for validation and
    /// diagnostics.
    pub fn named_amounts(&self) -> [(&'static str, Money); 10] {
        [
            ("basicAnnual", self.basic),
            ("hraAnnual", self.hra),
            ("specialAllowanceAnnual", self.special_allowance),
            ("conveyanceAnnual", self.conveyance),
            ("medicalAllowanceAnnual", self.medical_allowance),
            ("otherAllowanceAnnual", self.other_allowance),
            ("professionalTaxAnnual", self.professional_tax),
            ("otherDeductionAnnual", self.other_deduction),
            ("pfAnnual", self.pf_total),
            ("variablePayAnnual", self.variable_pay),
        ]
    }

    pub fn annual_earnings(&self) -> Money {
        self.basic
            + self.hra
            + self.special_allowance
            + self.conveyance
            + self.medical_allowance
            + self.other_allowance
    }

    pub fn employer_pf(&self) -> Money {
        Money::from_rounded(self.pf_total.as_f64() / 2.0)
    }

    /// Annual cost to company implied by the components: earnings, the
    /// employer's PF share and variable pay.  Deductions are paid out of
    /// earnings and do not add to cost.
    pub fn cost_to_company(&self) -> Money {
        self.annual_earnings() + self.employer_pf() + self.variable_pay
    }
}

/// Monthly view of an [`AnnualComponents`] set.  Each field is rounded
/// independently from its annual figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyComponents {
    pub basic: Money,
    pub hra: Money,
    pub special_allowance: Money,
    pub conveyance: Money,
    pub medical_allowance: Money,
    pub other_allowance: Money,
    pub employee_pf: Money,
    pub employer_pf: Money,
    pub professional_tax: Money,
    pub other_deduction: Money,
    pub variable_pay: Money,
}

impl MonthlyComponents {
    pub fn from_annual(annual: &AnnualComponents) -> Self {
        let pf_side = Money::from_rounded(annual.pf_total.as_f64() / 2.0 / 12.0);
        MonthlyComponents {
            basic: annual.basic.monthly(),
            hra: annual.hra.monthly(),
            special_allowance: annual.special_allowance.monthly(),
            conveyance: annual.conveyance.monthly(),
            medical_allowance: annual.medical_allowance.monthly(),
            other_allowance: annual.other_allowance.monthly(),
            employee_pf: pf_side,
            employer_pf: pf_side,
            professional_tax: annual.professional_tax.monthly(),
            other_deduction: annual.other_deduction.monthly(),
            variable_pay: annual.variable_pay.monthly(),
        }
    }

    pub fn gross(&self) -> Money {
        self.basic
            + self.hra
            + self.special_allowance
            + self.medical_allowance
            + self.conveyance
            + self.other_allowance
    }

    pub fn deductions(&self) -> Money {
        self.employee_pf + self.professional_tax + self.other_deduction
    }
}

/// Manual entry: explicit components plus an optional declared CTC used
/// for display and drift detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualInput {
    #[serde(flatten)]
    pub components: AnnualComponents,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_ctc: Option<Money>,
}

/// A compensation policy as entered in the structure editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CompensationInput {
    Guided(GuidedInput),
    Manual(ManualInput),
}

impl CompensationInput {
    pub fn mode(&self) -> EntryMode {
        match self {
            CompensationInput::Guided(_) => EntryMode::Guided,
            CompensationInput::Manual(_) => EntryMode::Manual,
        }
    }

    pub fn working_days_per_month(&self) -> i64 {
        match self {
            CompensationInput::Guided(input) => input.working_days_per_month,
            CompensationInput::Manual(input) => input.components.working_days_per_month,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    #[default]
    Guided,
    Manual,
}

/// Which path produced a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakdownSource {
    /// The remote preview service.
    Remote,
    /// The local CTC split.
    Local,
    /// Derived from manually entered components.
    Manual,
}

/// The full derived salary structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationBreakdown {
    pub annual: AnnualComponents,
    pub monthly: MonthlyComponents,
    pub monthly_gross: Money,
    pub monthly_deductions: Money,
    pub monthly_in_hand: Money,
    /// Gross pay for one working day.
    pub daily_rate: Money,
    /// The CTC reported to the user.
    pub annual_ctc: Money,
    /// `(monthly_gross + employer_pf) * 12 + variable_pay`.
    pub calculated_annual_ctc: Money,
    pub source: BreakdownSource,
}

impl CompensationBreakdown {
    /// Derives every monthly and total figure from the canonical annual
    /// set.  `annual_ctc` is the figure reported to the user.
    pub fn from_annual(
        annual: AnnualComponents,
        annual_ctc: Money,
        source: BreakdownSource,
    ) -> Self {
        let monthly = MonthlyComponents::from_annual(&annual);
        let monthly_gross = monthly.gross();
        let monthly_deductions = monthly.deductions();
        let calculated_annual_ctc =
            (monthly_gross + monthly.employer_pf).annualized() + annual.variable_pay;
        let days = annual.working_days_per_month.max(1) as f64;
        let daily_rate = Money::from_rounded(monthly_gross.as_f64() / days);
        CompensationBreakdown {
            monthly_in_hand: monthly_gross - monthly_deductions,
            monthly_gross,
            monthly_deductions,
            daily_rate,
            annual_ctc,
            calculated_annual_ctc,
            source,
            monthly,
            annual,
        }
    }
}
