use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use salary_engine::api::build_router;
use salary_engine::config::EngineConfig;
use salary_engine::models::{BreakdownSource, GuidedInput, Money, VariablePayPolicy};
use salary_engine::persistence::{HttpSalaryStore, PersistedSalary, SalaryStore, UpdateCtcRequest};
use salary_engine::preview::HttpPreviewClient;
use salary_engine::reconcile::SalaryDraft;
use salary_engine::resolver::resolve_from_ctc;
use salary_engine::statutory::StatutoryRules;
use salary_engine::{Resolver, SalaryError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn local_router() -> Router {
    build_router(Resolver::local(StatutoryRules::default())).0
}

fn guided(ctc: i64, policy: VariablePayPolicy) -> GuidedInput {
    GuidedInput::new(Money::from_units(ctc), policy)
}

#[tokio::test]
async fn remote_calculator_agrees_with_local_formulas() {
    let base = spawn(local_router()).await;
    let client = HttpPreviewClient::new(&format!("{base}/api"), Duration::from_secs(5)).unwrap();
    let resolver = Resolver::local(StatutoryRules::default())
        .with_preview(Arc::new(client), Duration::from_secs(5));

    let inputs = [
        guided(1_200_000, VariablePayPolicy::NONE),
        guided(1_000_000, VariablePayPolicy::percentage(10.0)),
        guided(2_345_678, VariablePayPolicy::fixed(150_000.0)),
    ];
    for input in inputs {
        let remote = resolver.resolve_guided(&input).await;
        let local = resolve_from_ctc(&input, resolver.rules());
        assert_eq!(remote.source, BreakdownSource::Remote);
        assert_eq!(remote.annual, local.annual, "ctc {}", input.annual_ctc);
        assert_eq!(remote.monthly, local.monthly);
        assert_eq!(remote.monthly_in_hand, local.monthly_in_hand);
    }
}

#[tokio::test]
async fn rejected_preview_falls_back_locally() {
    let base = spawn(local_router()).await;
    let client = HttpPreviewClient::new(&format!("{base}/api"), Duration::from_secs(5)).unwrap();
    let resolver = Resolver::local(StatutoryRules::default())
        .with_preview(Arc::new(client), Duration::from_secs(5));

    // Over the variable-pay cap: the server answers 422, the preview still renders.
    let input = guided(1_200_000, VariablePayPolicy::percentage(60.0));
    let breakdown = resolver.resolve_guided(&input).await;
    assert_eq!(breakdown.source, BreakdownSource::Local);
    assert_eq!(breakdown.annual.variable_pay.units(), 720_000);
}

#[tokio::test]
async fn unreachable_preview_falls_back_locally() {
    let client = HttpPreviewClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let resolver = Resolver::local(StatutoryRules::default())
        .with_preview(Arc::new(client), Duration::from_secs(1));
    let breakdown = resolver.resolve_guided(&guided(1_200_000, VariablePayPolicy::NONE)).await;
    assert_eq!(breakdown.source, BreakdownSource::Local);
    assert_eq!(breakdown.monthly_in_hand.units(), 87_800);
}

#[tokio::test]
async fn configured_preview_url_routes_the_preview_endpoint_upstream() {
    async fn upstream_preview() -> Json<Value> {
        Json(json!({"data": {"annualBasic": 700000}}))
    }
    let upstream = spawn(Router::new().route("/salary/preview", post(upstream_preview))).await;

    let config = EngineConfig::from_lookup(|key| match key {
        "SALARY_PREVIEW_URL" => Some(upstream.clone()),
        "SALARY_PREVIEW_TIMEOUT_MS" => Some("2000".to_string()),
        _ => None,
    })
    .unwrap();
    let resolver = config.resolver(config.load_rules().unwrap()).unwrap();
    let (router, _state) = build_router(resolver);
    let base = spawn(router).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{base}/api/salary/preview"))
        .json(&json!({"annualCtc": 1200000}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["annualBasic"], 700_000);
    // Fields the upstream left out come from the local formulas.
    assert_eq!(body["annualHra"], 300_000);
}

#[tokio::test]
async fn preview_endpoint_reports_out_of_range_working_days_per_field() {
    let base = spawn(local_router()).await;
    for days in [300, -4] {
        let response = reqwest::Client::new()
            .post(format!("{base}/api/salary/preview"))
            .json(&json!({"annualCtc": 1200000, "workingDaysPerMonth": days}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["fields"][0]["field"], "workingDaysPerMonth");
        assert_eq!(body["error"], "working days per month must be between 1 and 31");
    }
}

#[tokio::test]
async fn preview_endpoint_reports_field_errors() {
    let base = spawn(local_router()).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/api/salary/preview"))
        .json(&json!({"annualCtc": 1200000, "variablePayType": "fixed", "variablePayValue": 700000}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["fields"][0]["field"], "variablePayValue");
    assert_eq!(body["error"], "variable pay cannot exceed 50% of CTC");
}

#[tokio::test]
async fn components_endpoint_derives_ctc() {
    let base = spawn(local_router()).await;
    let body: Value = reqwest::Client::new()
        .post(format!("{base}/api/salary/components"))
        .json(&json!({
            "basicAnnual": 600000,
            "hraAnnual": 300000,
            "specialAllowanceAnnual": 228000,
            "pfAnnual": 144000,
            "professionalTaxAnnual": 2400
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["monthlyInHand"], 87_800);
    assert_eq!(body["annualCtc"], 1_200_000);
}

fn salary_service() -> Router {
    async fn create(Json(body): Json<Value>) -> impl IntoResponse {
        if body["annualCtc"].as_i64().unwrap_or_default() > 5_000_000 {
            let error = json!({"message": "CTC exceeds the approved band"});
            return (StatusCode::BAD_REQUEST, Json(error));
        }
        let input: GuidedInput = serde_json::from_value(body.clone()).unwrap();
        let components = resolve_from_ctc(&input, &StatutoryRules::default()).annual;
        let saved = PersistedSalary {
            employee_id: body["employeeId"].as_str().unwrap_or_default().to_string(),
            annual_ctc: input.annual_ctc,
            variable_pay: input.variable_pay,
            components,
        };
        (StatusCode::CREATED, Json(json!({ "data": saved })))
    }

    async fn update_ctc(Path(employee_id): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
        let mut input: GuidedInput = serde_json::from_value(body).unwrap();
        input.working_days_per_month = 22;
        let components = resolve_from_ctc(&input, &StatutoryRules::default()).annual;
        Json(PersistedSalary {
            employee_id,
            annual_ctc: input.annual_ctc,
            variable_pay: input.variable_pay,
            components,
        })
    }

    Router::new()
        .route("/salary", post(create))
        .route("/salary/:employee_id/ctc", put(update_ctc))
}

#[tokio::test]
async fn draft_saves_and_reloads_through_http_store() {
    let base = spawn(salary_service()).await;
    let store = HttpSalaryStore::new(&base, Duration::from_secs(5)).unwrap();
    let rules = StatutoryRules::default();

    let mut draft = SalaryDraft::new("EMP-7");
    draft.guided = guided(1_200_000, VariablePayPolicy::NONE);
    let saved = draft.submit(&store, &rules).await.unwrap();
    assert_eq!(saved.employee_id, "EMP-7");
    assert_eq!(saved.components.pf_total.units(), 144_000);

    draft.guided.annual_ctc = Money::from_units(1_500_000);
    let saved = draft.submit(&store, &rules).await.unwrap();
    assert_eq!(saved.annual_ctc.units(), 1_500_000);
    assert_eq!(saved.components.working_days_per_month, 22);
    assert_eq!(draft.manual.basic.units(), 750_000);
}

#[tokio::test]
async fn employee_ids_with_reserved_characters_reach_the_service_intact() {
    let base = spawn(salary_service()).await;
    let store = HttpSalaryStore::new(&base, Duration::from_secs(5)).unwrap();
    let request = UpdateCtcRequest::from(&guided(1_200_000, VariablePayPolicy::NONE));
    let saved = store.update_ctc("EMP/7 ?a", &request).await.unwrap();
    assert_eq!(saved.employee_id, "EMP/7 ?a");
}

#[tokio::test]
async fn server_rejection_is_attached_to_ctc_and_draft_survives() {
    let base = spawn(salary_service()).await;
    let store = HttpSalaryStore::new(&base, Duration::from_secs(5)).unwrap();
    let rules = StatutoryRules::default();

    let mut draft = SalaryDraft::new("EMP-8");
    draft.guided = guided(6_000_000, VariablePayPolicy::NONE);
    let before = draft.clone();
    match draft.submit(&store, &rules).await.unwrap_err() {
        SalaryError::Persistence { message, field } => {
            assert_eq!(message, "CTC exceeds the approved band");
            assert_eq!(field.as_deref(), Some("annualCtc"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(draft, before);
}
