//! Reconciliation between guided and manual entry.
//!
//! [`SalaryDraft`] is the editor's in-memory state for one employee:
//! mode switching, CTC drift, submit-time validation and the save /
//! reload cycle.  [`PreviewPipeline`] drives the live preview: input
//! changes are debounced and only the newest request's result is ever
//! published.

use crate::error::{SalaryResult, ValidationReport};
use crate::models::{
    AnnualComponents, CompensationBreakdown, CompensationInput, EntryMode, GuidedInput,
    ManualInput, Money,
};
use crate::persistence::{CreateSalaryRequest, PersistedSalary, SalaryStore, UpdateCtcRequest};
use crate::resolver::{annualize, Resolver};
use crate::statutory::StatutoryRules;
use crate::validation::{validate_employee, validate_guided, validate_manual};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default delay between the last input change and a recompute.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Editor state for one employee's salary structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryDraft {
    pub employee_id: Option<String>,
    pub mode: EntryMode,
    pub guided: GuidedInput,
    pub manual: AnnualComponents,
    /// CTC typed by the user while in manual mode.
    pub declared_ctc: Option<Money>,
    existing_salary: Option<PersistedSalary>,
}

impl SalaryDraft {
    pub fn new(employee_id: impl Into<String>) -> Self {
        SalaryDraft {
            employee_id: Some(employee_id.into()),
            ..SalaryDraft::default()
        }
    }

    /// Open the editor on a structure already stored for the employee.
    pub fn from_existing(existing: PersistedSalary) -> Self {
        let mut draft = SalaryDraft::new(existing.employee_id.clone());
        draft.load_baseline(existing);
        draft
    }

    /// Replace the draft with a stored structure.  Guided fields take
    /// the stored CTC and policy; manual fields take the components.
    pub fn load_baseline(&mut self, saved: PersistedSalary) -> &PersistedSalary {
        self.guided = GuidedInput {
            annual_ctc: saved.annual_ctc,
            variable_pay: saved.variable_pay,
            working_days_per_month: saved.components.working_days_per_month,
        };
        self.manual = saved.components.clone();
        self.declared_ctc = (!saved.annual_ctc.is_zero()).then_some(saved.annual_ctc);
        self.existing_salary.insert(saved)
    }

    pub fn existing_salary(&self) -> Option<&PersistedSalary> {
        self.existing_salary.as_ref()
    }

    /// The input the resolver should see for the current mode.
    pub fn input(&self) -> CompensationInput {
        match self.mode {
            EntryMode::Guided => CompensationInput::Guided(self.guided.clone()),
            EntryMode::Manual => CompensationInput::Manual(ManualInput {
                components: self.manual.clone(),
                annual_ctc: self.declared_ctc,
            }),
        }
    }

    /// Switch to manual entry, populating every manual field from the
    /// last guided breakdown so both modes agree at the switch.
    pub fn switch_to_manual(&mut self, last_guided: &CompensationBreakdown) {
        self.manual = annualize(last_guided);
        self.manual.working_days_per_month = self.guided.working_days_per_month;
        self.declared_ctc = Some(self.guided.annual_ctc);
        self.mode = EntryMode::Manual;
        debug!(ctc = self.guided.annual_ctc.units(), "switched to manual entry");
    }

    /// Switch to guided entry.  A declared manual CTC seeds the guided
    /// CTC when none has been entered yet.
    pub fn switch_to_guided(&mut self) {
        if self.guided.annual_ctc.is_zero() {
            if let Some(ctc) = self.declared_ctc {
                self.guided.annual_ctc = ctc;
            }
        }
        self.guided.working_days_per_month = self.manual.working_days_per_month;
        self.mode = EntryMode::Guided;
    }

    /// Declared CTC minus the CTC implied by the manual components.
    /// Only meaningful in manual mode with a declared CTC.
    pub fn ctc_difference(&self) -> Option<Money> {
        match (self.mode, self.declared_ctc) {
            (EntryMode::Manual, Some(declared)) if !declared.is_zero() => {
                Some(declared - self.manual.cost_to_company())
            }
            _ => None,
        }
    }

    pub fn validate(&self, rules: &StatutoryRules) -> Result<(), ValidationReport> {
        let mut report = ValidationReport::default();
        validate_employee(self.employee_id.as_deref(), &mut report);
        match self.input() {
            CompensationInput::Guided(guided) => validate_guided(&guided, rules, &mut report),
            CompensationInput::Manual(manual) => validate_manual(&manual, &mut report),
        }
        report.into_result()
    }

    /// Validate and persist.  Re-guiding an existing structure updates
    /// only its CTC; everything else creates a structure.  On success
    /// the stored structure becomes the new baseline; on failure the
    /// draft is left untouched.
    pub async fn submit(
        &mut self,
        store: &dyn SalaryStore,
        rules: &StatutoryRules,
    ) -> SalaryResult<&PersistedSalary> {
        self.validate(rules)?;
        let employee_id = self.employee_id.clone().unwrap_or_default();
        let saved = match (self.mode, &self.existing_salary) {
            (EntryMode::Guided, Some(_)) => {
                store
                    .update_ctc(&employee_id, &UpdateCtcRequest::from(&self.guided))
                    .await?
            }
            _ => {
                let request = CreateSalaryRequest {
                    employee_id: employee_id.clone(),
                    input: self.input(),
                };
                store.create_salary(&request).await?
            }
        };
        info!(employee = %employee_id, mode = ?self.mode, "salary structure saved");
        Ok(self.load_baseline(saved))
    }
}

/// Monotonic request counter.  Each recompute takes a ticket; a result
/// may only be applied while its ticket is still the latest issued.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: AtomicU64,
}

impl RequestGeneration {
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest() == ticket
    }
}

/// The breakdown currently shown in the preview.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    pub generation: u64,
    pub breakdown: CompensationBreakdown,
}

/// Debounced recompute feeding a watch channel.
///
/// A new request within the debounce window cancels the pending one.
/// A computation that completes after a newer request was issued is
/// discarded.
pub struct PreviewPipeline {
    resolver: Arc<Resolver>,
    debounce: Duration,
    slot: Arc<PreviewSlot>,
    pending: Option<JoinHandle<()>>,
}

/// Generation counter and channel shared with in-flight recomputes.
#[derive(Debug)]
struct PreviewSlot {
    generation: RequestGeneration,
    sender: watch::Sender<Option<PreviewState>>,
}

impl PreviewSlot {
    fn complete(&self, ticket: u64, breakdown: CompensationBreakdown) -> bool {
        self.sender.send_if_modified(|current| {
            if !self.generation.is_current(ticket) {
                debug!(ticket, latest = self.generation.latest(), "discarding stale preview");
                return false;
            }
            *current = Some(PreviewState {
                generation: ticket,
                breakdown,
            });
            true
        })
    }
}

impl PreviewPipeline {
    pub fn new(resolver: Arc<Resolver>, debounce: Duration) -> Self {
        let (sender, _) = watch::channel(None);
        PreviewPipeline {
            resolver,
            debounce,
            slot: Arc::new(PreviewSlot {
                generation: RequestGeneration::default(),
                sender,
            }),
            pending: None,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PreviewState>> {
        self.slot.sender.subscribe()
    }

    pub fn latest(&self) -> Option<PreviewState> {
        self.slot.sender.borrow().clone()
    }

    /// Publish a breakdown computed for `ticket`.  Returns `false`, and
    /// leaves the preview untouched, when a newer request has been
    /// issued since.
    pub fn complete(&self, ticket: u64, breakdown: CompensationBreakdown) -> bool {
        self.slot.complete(ticket, breakdown)
    }

    /// Schedule a recompute for `input`, returning its generation.
    pub fn request(&mut self, input: CompensationInput) -> u64 {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        let ticket = self.slot.generation.issue();
        let resolver = Arc::clone(&self.resolver);
        let slot = Arc::clone(&self.slot);
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if !slot.generation.is_current(ticket) {
                return;
            }
            let breakdown = resolver.resolve(&input).await;
            slot.complete(ticket, breakdown);
        }));
        ticket
    }
}

impl Drop for PreviewPipeline {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
