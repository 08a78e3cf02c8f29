//! Persistence collaborator.
//!
//! Two operations: create a full structure, or re-guide an existing one
//! by updating only its CTC and variable-pay policy.  Both return the
//! stored structure in the manual annual-component shape so the editor
//! can reload it as its new baseline.

use crate::error::{SalaryError, SalaryResult};
use crate::models::{AnnualComponents, CompensationInput, GuidedInput, Money, VariablePayPolicy};
use crate::preview::unwrap_envelope;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Create body: the employee plus either the guided policy or the
/// manual component set, tagged by `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalaryRequest {
    pub employee_id: String,
    #[serde(flatten)]
    pub input: CompensationInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCtcRequest {
    pub annual_ctc: Money,
    #[serde(flatten)]
    pub variable_pay: VariablePayPolicy,
}

impl From<&GuidedInput> for UpdateCtcRequest {
    fn from(input: &GuidedInput) -> Self {
        UpdateCtcRequest {
            annual_ctc: input.annual_ctc,
            variable_pay: input.variable_pay,
        }
    }
}

/// A stored salary structure as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSalary {
    pub employee_id: String,
    #[serde(default)]
    pub annual_ctc: Money,
    #[serde(flatten)]
    pub variable_pay: VariablePayPolicy,
    #[serde(flatten)]
    pub components: AnnualComponents,
}

#[async_trait]
pub trait SalaryStore: Send + Sync {
    async fn create_salary(&self, request: &CreateSalaryRequest) -> SalaryResult<PersistedSalary>;

    async fn update_ctc(
        &self,
        employee_id: &str,
        request: &UpdateCtcRequest,
    ) -> SalaryResult<PersistedSalary>;
}

/// [`SalaryStore`] over HTTP.
///
/// - create: `POST <base>/salary`
/// - update CTC: `PUT <base>/salary/{employee}/ctc`
///
/// The employee id is percent-encoded as a single path segment.
pub struct HttpSalaryStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSalaryStore {
    pub fn new(base_url: &str, timeout: Duration) -> SalaryResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| SalaryError::Config(format!("salary service url {base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SalaryError::Config(format!(
                "salary service url {base_url} cannot carry a path"
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpSalaryStore { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_response(response: reqwest::Response) -> SalaryResult<PersistedSalary> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = server_message(&body)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return Err(rejection(message));
        }
        let object = unwrap_envelope(&body).ok_or_else(|| {
            rejection("salary service returned an empty response".to_string())
        })?;
        Ok(serde_json::from_value(Value::Object(object.clone()))?)
    }
}

#[async_trait]
impl SalaryStore for HttpSalaryStore {
    async fn create_salary(&self, request: &CreateSalaryRequest) -> SalaryResult<PersistedSalary> {
        let response = self
            .client
            .post(self.endpoint(&["salary"]))
            .json(request)
            .send()
            .await?;
        let saved = Self::read_response(response).await?;
        info!(employee = %saved.employee_id, ctc = saved.annual_ctc.units(), "salary structure created");
        Ok(saved)
    }

    async fn update_ctc(
        &self,
        employee_id: &str,
        request: &UpdateCtcRequest,
    ) -> SalaryResult<PersistedSalary> {
        let response = self
            .client
            .put(self.endpoint(&["salary", employee_id, "ctc"]))
            .json(request)
            .send()
            .await?;
        let saved = Self::read_response(response).await?;
        info!(employee = %saved.employee_id, ctc = saved.annual_ctc.units(), "salary CTC updated");
        Ok(saved)
    }
}

fn server_message(body: &Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Build a persistence error, attaching it to the CTC field when the
/// server message is about CTC.
pub fn rejection(message: String) -> SalaryError {
    let field = message
        .to_lowercase()
        .contains("ctc")
        .then(|| "annualCtc".to_string());
    SalaryError::Persistence { message, field }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ctc_messages_attach_to_the_ctc_field() {
        match rejection("CTC must be at least 1,00,000".to_string()) {
            SalaryError::Persistence { field, .. } => assert_eq!(field.as_deref(), Some("annualCtc")),
            other => panic!("unexpected error {other:?}"),
        }
        match rejection("employee not found".to_string()) {
            SalaryError::Persistence { field, .. } => assert_eq!(field, None),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn employee_id_is_a_single_encoded_segment() {
        let store = HttpSalaryStore::new("http://payroll.internal/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.endpoint(&["salary"]).as_str(),
            "http://payroll.internal/api/salary"
        );
        assert_eq!(
            store.endpoint(&["salary", "EMP/7 ?x", "ctc"]).as_str(),
            "http://payroll.internal/api/salary/EMP%2F7%20%3Fx/ctc"
        );
    }

    #[test]
    fn unusable_base_url_is_a_config_error() {
        assert!(matches!(
            HttpSalaryStore::new("not a url", Duration::from_secs(1)),
            Err(SalaryError::Config(_))
        ));
        assert!(matches!(
            HttpSalaryStore::new("mailto:payroll@example.com", Duration::from_secs(1)),
            Err(SalaryError::Config(_))
        ));
    }

    #[test]
    fn server_message_reads_known_keys() {
        assert_eq!(server_message(&json!({"error": "duplicate"})).as_deref(), Some("duplicate"));
        assert_eq!(server_message(&json!({"code": 7})), None);
    }

    #[test]
    fn create_request_flattens_the_submission() {
        let request = CreateSalaryRequest {
            employee_id: "EMP-1".to_string(),
            input: CompensationInput::Guided(GuidedInput::new(
                Money::from_units(1_200_000),
                VariablePayPolicy::NONE,
            )),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["mode"], "guided");
        assert_eq!(body["employeeId"], "EMP-1");
        assert_eq!(body["annualCtc"], 1_200_000);
        assert_eq!(body["variablePayType"], "none");
    }

    #[test]
    fn persisted_salary_reads_manual_shape() {
        let saved: PersistedSalary = serde_json::from_value(json!({
            "employeeId": "EMP-1",
            "annualCtc": 1200000,
            "variablePayType": "none",
            "variablePayValue": 0,
            "basicAnnual": 600000,
            "hraAnnual": 300000,
            "specialAllowanceAnnual": 228000,
            "pfAnnual": 144000,
            "professionalTaxAnnual": 2400
        }))
        .unwrap();
        assert_eq!(saved.components.basic.units(), 600_000);
        assert_eq!(saved.components.pf_total.units(), 144_000);
        assert_eq!(saved.components.working_days_per_month, crate::models::DEFAULT_WORKING_DAYS);
    }
}
