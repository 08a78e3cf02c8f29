//! Compensation resolver.
//!
//! Two directions:
//!
//! - [`resolve_from_ctc`]: annual CTC and a variable-pay policy are split
//!   into Basic, HRA, PF and a balancing Special Allowance.
//! - [`resolve_from_components`]: a hand-entered annual component set
//!   yields its monthly view and the CTC it implies.
//!
//! [`Resolver`] wraps the guided direction: it asks the remote preview
//! calculator first and falls back to [`resolve_from_ctc`] on any
//! failure.  Both paths produce the same breakdown for the same input.

use crate::error::PreviewError;
use crate::models::{
    AnnualComponents, BreakdownSource, CompensationBreakdown, CompensationInput, GuidedInput,
    ManualInput, Money,
};
use crate::preview::{normalize, PreviewRequest, PreviewService};
use crate::statutory::StatutoryRules;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bound on a remote preview call.
pub const DEFAULT_PREVIEW_TIMEOUT: Duration = Duration::from_secs(10);

/// Split an annual CTC into components using the local statutory rules.
pub fn resolve_from_ctc(input: &GuidedInput, rules: &StatutoryRules) -> CompensationBreakdown {
    let annual_ctc = input.annual_ctc.as_f64();
    let variable_pay = input.variable_pay.annual_amount(input.annual_ctc).max(0.0);
    let fixed_ctc = (annual_ctc - variable_pay).max(0.0);

    let basic = (fixed_ctc * rules.basic_ratio).round();
    let hra = (basic * rules.hra_ratio).round();
    let pf_one_side = (basic * rules.pf_rate).round();
    // Professional Tax and other deductions come out of gross; they are
    // not part of the fixed CTC being balanced here.
    let special_allowance = (fixed_ctc - basic - hra - pf_one_side).max(0.0);

    let annual = AnnualComponents {
        basic: Money::from_rounded(basic),
        hra: Money::from_rounded(hra),
        special_allowance: Money::from_rounded(special_allowance),
        conveyance: Money::zero(),
        medical_allowance: Money::zero(),
        other_allowance: Money::zero(),
        professional_tax: rules.professional_tax_annual,
        other_deduction: Money::zero(),
        pf_total: Money::from_rounded(pf_one_side * 2.0),
        variable_pay: Money::from_rounded(variable_pay),
        working_days_per_month: input.working_days_per_month,
    };
    CompensationBreakdown::from_annual(annual, input.annual_ctc, BreakdownSource::Local)
}

/// Derive the monthly view and implied CTC of a manual component set.
///
/// A non-zero `declared_ctc` is reported as the CTC; the implied figure
/// stays available as `calculated_annual_ctc` for drift detection.
pub fn resolve_from_components(
    components: &AnnualComponents,
    declared_ctc: Option<Money>,
) -> CompensationBreakdown {
    let mut breakdown =
        CompensationBreakdown::from_annual(components.clone(), Money::zero(), BreakdownSource::Manual);
    breakdown.annual_ctc = match declared_ctc {
        Some(ctc) if !ctc.is_zero() => ctc,
        _ => breakdown.calculated_annual_ctc,
    };
    breakdown
}

/// The manual component set matching a breakdown exactly.  Used when the
/// editor switches from guided to manual entry.
pub fn annualize(breakdown: &CompensationBreakdown) -> AnnualComponents {
    breakdown.annual.clone()
}

/// Remote-first resolver with a local fallback.
#[derive(Clone)]
pub struct Resolver {
    preview: Option<Arc<dyn PreviewService>>,
    rules: StatutoryRules,
    timeout: Duration,
}

impl Resolver {
    /// A resolver that only ever computes locally.
    pub fn local(rules: StatutoryRules) -> Self {
        Resolver {
            preview: None,
            rules,
            timeout: DEFAULT_PREVIEW_TIMEOUT,
        }
    }

    pub fn with_preview(mut self, preview: Arc<dyn PreviewService>, timeout: Duration) -> Self {
        self.preview = Some(preview);
        self.timeout = timeout;
        self
    }

    pub fn rules(&self) -> &StatutoryRules {
        &self.rules
    }

    /// Whether guided inputs are sent to a remote calculator first.
    pub fn has_remote(&self) -> bool {
        self.preview.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn resolve(&self, input: &CompensationInput) -> CompensationBreakdown {
        match input {
            CompensationInput::Guided(guided) => self.resolve_guided(guided).await,
            CompensationInput::Manual(ManualInput {
                components,
                annual_ctc,
            }) => resolve_from_components(components, *annual_ctc),
        }
    }

    /// Resolve a guided input, preferring the remote calculator.
    pub async fn resolve_guided(&self, input: &GuidedInput) -> CompensationBreakdown {
        let local = resolve_from_ctc(input, &self.rules);
        let Some(preview) = &self.preview else {
            return local;
        };
        match self.fetch_remote(preview.as_ref(), input, &local).await {
            Ok(remote) => {
                if remote.annual != local.annual {
                    debug!(
                        ctc = input.annual_ctc.units(),
                        remote = ?remote.annual,
                        local = ?local.annual,
                        "remote preview differs from local formulas"
                    );
                }
                remote
            }
            Err(err) => {
                warn!(error = %err, ctc = input.annual_ctc.units(), "preview service unavailable, using local formulas");
                local
            }
        }
    }

    async fn fetch_remote(
        &self,
        preview: &dyn PreviewService,
        input: &GuidedInput,
        local: &CompensationBreakdown,
    ) -> Result<CompensationBreakdown, PreviewError> {
        let request = PreviewRequest::from(input);
        let response = tokio::time::timeout(self.timeout, preview.preview(&request))
            .await
            .map_err(|_| PreviewError::TimedOut(self.timeout))??;
        let fields = normalize(&response)?;
        Ok(fields.into_breakdown(input, local))
    }
}
