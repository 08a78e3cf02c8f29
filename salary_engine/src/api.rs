//! HTTP API for the Salary Engine.
//!
//! This module exposes the resolver using the
//! [`axum`](https://crates.io/crates/axum) framework.  The preview
//! endpoint speaks the same contract the remote preview calculator
//! does, so one deployment can serve as the authoritative calculator
//! for others.  When the resolver is configured with a remote
//! calculator, previews go there first and fall back locally.
//!
//! - `POST /api/salary/preview`: guided CTC split
//! - `POST /api/salary/components`: manual component set
//! - `POST /api/salary/register`: bulk register
//! - `GET /health`

use crate::engine::{build_register, RegisterEntry};
use crate::error::ValidationReport;
use crate::models::{
    CompensationBreakdown, GuidedInput, ManualInput, Money, VariablePayPolicy, VariablePayType,
};
use crate::resolver::{resolve_from_components, Resolver};
use crate::statutory::StatutoryRules;
use crate::validation::{validate_guided, validate_manual};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Application state shared across requests.
pub struct AppState {
    pub resolver: Resolver,
}

impl AppState {
    pub fn rules(&self) -> &StatutoryRules {
        self.resolver.rules()
    }
}

/// Body of `POST /api/salary/preview`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewBody {
    pub annual_ctc: Money,
    #[serde(default)]
    pub variable_pay_type: VariablePayType,
    #[serde(default)]
    pub variable_pay_value: f64,
    pub working_days_per_month: Option<i64>,
}

impl From<PreviewBody> for GuidedInput {
    fn from(body: PreviewBody) -> Self {
        let mut input = GuidedInput::new(
            body.annual_ctc,
            VariablePayPolicy {
                kind: body.variable_pay_type,
                value: body.variable_pay_value,
            },
        );
        if let Some(days) = body.working_days_per_month {
            input.working_days_per_month = days;
        }
        input
    }
}

/// Flat response shape: every figure as a top-level `monthly*` or
/// `annual*` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub monthly_basic: Money,
    pub monthly_hra: Money,
    pub monthly_special_allowance: Money,
    pub monthly_conveyance: Money,
    pub monthly_medical_allowance: Money,
    pub monthly_other_allowance: Money,
    pub monthly_employee_pf: Money,
    pub monthly_employer_pf: Money,
    pub monthly_professional_tax: Money,
    pub monthly_other_deduction: Money,
    pub monthly_gross: Money,
    pub monthly_deductions: Money,
    pub monthly_in_hand: Money,
    pub annual_basic: Money,
    pub annual_hra: Money,
    pub annual_special_allowance: Money,
    pub annual_pf_total: Money,
    pub annual_professional_tax: Money,
    pub annual_variable_pay: Money,
    pub annual_ctc: Money,
    pub calculated_annual_ctc: Money,
    pub daily_rate: Money,
}

impl From<&CompensationBreakdown> for PreviewResponse {
    fn from(b: &CompensationBreakdown) -> Self {
        PreviewResponse {
            monthly_basic: b.monthly.basic,
            monthly_hra: b.monthly.hra,
            monthly_special_allowance: b.monthly.special_allowance,
            monthly_conveyance: b.monthly.conveyance,
            monthly_medical_allowance: b.monthly.medical_allowance,
            monthly_other_allowance: b.monthly.other_allowance,
            monthly_employee_pf: b.monthly.employee_pf,
            monthly_employer_pf: b.monthly.employer_pf,
            monthly_professional_tax: b.monthly.professional_tax,
            monthly_other_deduction: b.monthly.other_deduction,
            monthly_gross: b.monthly_gross,
            monthly_deductions: b.monthly_deductions,
            monthly_in_hand: b.monthly_in_hand,
            annual_basic: b.annual.basic,
            annual_hra: b.annual.hra,
            annual_special_allowance: b.annual.special_allowance,
            annual_pf_total: b.annual.pf_total,
            annual_professional_tax: b.annual.professional_tax,
            annual_variable_pay: b.annual.variable_pay,
            annual_ctc: b.annual_ctc,
            calculated_annual_ctc: b.calculated_annual_ctc,
            daily_rate: b.daily_rate,
        }
    }
}

/// Build the API router around `resolver`.
pub fn build_router(resolver: Resolver) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState { resolver });
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/salary/preview", post(preview_handler))
        .route("/api/salary/components", post(components_handler))
        .route("/api/salary/register", post(register_handler))
        .with_state(state.clone());
    (router, state)
}

fn validation_failure(report: ValidationReport) -> Response {
    debug!(summary = %report.summary(), "rejected salary input");
    let body = Json(serde_json::json!({
        "error": report.summary(),
        "fields": report.errors,
    }));
    (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Handler for POST /api/salary/preview
async fn preview_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<PreviewBody>,
) -> Response {
    let input = GuidedInput::from(body);
    let mut report = ValidationReport::default();
    validate_guided(&input, app_state.rules(), &mut report);
    if let Err(report) = report.into_result() {
        return validation_failure(report);
    }
    let breakdown = app_state.resolver.resolve_guided(&input).await;
    (StatusCode::OK, Json(PreviewResponse::from(&breakdown))).into_response()
}

/// Handler for POST /api/salary/components
async fn components_handler(Json(input): Json<ManualInput>) -> Response {
    let mut report = ValidationReport::default();
    validate_manual(&input, &mut report);
    if let Err(report) = report.into_result() {
        return validation_failure(report);
    }
    let breakdown = resolve_from_components(&input.components, input.annual_ctc);
    (StatusCode::OK, Json(PreviewResponse::from(&breakdown))).into_response()
}

/// Handler for POST /api/salary/register
async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(entries): Json<Vec<RegisterEntry>>,
) -> Response {
    let rules = app_state.rules().clone();
    match tokio::task::spawn_blocking(move || build_register(entries, &rules)).await {
        Ok(register) => (StatusCode::OK, Json(register)).into_response(),
        Err(err) => {
            let body = Json(serde_json::json!({"error": err.to_string()}));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

/// Launch the API server on `addr`.  Blocks until the server
/// terminates.
pub async fn serve(addr: &str, resolver: Resolver) -> Result<()> {
    let remote_preview = resolver.has_remote();
    let (router, _state) = build_router(resolver);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, remote_preview, "salary engine listening");
    axum::serve(listener, router).await?;
    Ok(())
}
