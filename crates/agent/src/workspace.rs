use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use caseworth_core::damages::{
    CategoryGroup, DamageAggregator, DamageSummary, FormField, ReconciliationEngine, ValuationForm,
};
use caseworth_core::domain::case::{CaseId, CaseRecord};
use caseworth_core::domain::damage::{DamageElement, DamageElementDraft, DamageElementId};
use caseworth_core::domain::valuation::{
    CaseValuation, CaseValuationInput, DamageCalculation, SettlementHistoryEntry,
};
use caseworth_core::errors::{ApplicationError, RemoteServiceError};
use caseworth_core::valuation::{
    policy_limit_position, synthesize_range, DeterministicValuationEngine, RemoteValuationService,
    SettlementRangeDisplay, ValuationEngine, ValuationPrecondition,
};
use caseworth_db::repositories::{
    CaseRecordRepository, DamageCalculationRepository, DamageElementRepository,
    InMemoryCaseRecordRepository, InMemoryDamageCalculationRepository,
    InMemoryDamageElementRepository, InMemoryMedicalRecordRepository,
    InMemorySettlementHistoryRepository, MedicalRecordRepository, MemoryTables, RepositoryError,
    SettlementHistoryRepository, SqlCaseRecordRepository, SqlDamageCalculationRepository,
    SqlDamageElementRepository, SqlMedicalRecordRepository, SqlSettlementHistoryRepository,
};
use caseworth_db::DbPool;

use crate::remote::evaluate_within;
use crate::scope::{CaseScope, CaseToken};

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistence collaborators the workspace reads and writes through.
#[derive(Clone)]
pub struct WorkspaceStores {
    pub cases: Arc<dyn CaseRecordRepository>,
    pub elements: Arc<dyn DamageElementRepository>,
    pub medical_records: Arc<dyn MedicalRecordRepository>,
    pub calculations: Arc<dyn DamageCalculationRepository>,
    pub history: Arc<dyn SettlementHistoryRepository>,
}

impl WorkspaceStores {
    pub fn sqlite(pool: DbPool) -> Self {
        Self {
            cases: Arc::new(SqlCaseRecordRepository::new(pool.clone())),
            elements: Arc::new(SqlDamageElementRepository::new(pool.clone())),
            medical_records: Arc::new(SqlMedicalRecordRepository::new(pool.clone())),
            calculations: Arc::new(SqlDamageCalculationRepository::new(pool.clone())),
            history: Arc::new(SqlSettlementHistoryRepository::new(pool)),
        }
    }

    pub fn in_memory(tables: Arc<MemoryTables>) -> Self {
        Self {
            cases: Arc::new(InMemoryCaseRecordRepository::new(tables.clone())),
            elements: Arc::new(InMemoryDamageElementRepository::new(tables.clone())),
            medical_records: Arc::new(InMemoryMedicalRecordRepository::new(tables.clone())),
            calculations: Arc::new(InMemoryDamageCalculationRepository::new(tables.clone())),
            history: Arc::new(InMemorySettlementHistoryRepository::new(tables)),
        }
    }
}

/// Settlement bar for the current valuation plus the policy-limit marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RangeView {
    pub range: SettlementRangeDisplay,
    pub policy_limit_position: Decimal,
}

#[derive(Default)]
struct WorkspaceState {
    case: Option<CaseRecord>,
    elements: Vec<DamageElement>,
    valuation: Option<CaseValuation>,
    policy_limit: Option<Decimal>,
}

/// Valuation state for the one active case.
///
/// Selecting a case resets everything held for the previous one and cancels
/// any remote valuation still in flight for it. Results computed for a case
/// that is no longer active are dropped, never committed.
pub struct ValuationWorkspace {
    stores: WorkspaceStores,
    engine: Arc<dyn ValuationEngine>,
    remote: Option<Arc<dyn RemoteValuationService>>,
    remote_timeout: Duration,
    scope: CaseScope,
    state: RwLock<WorkspaceState>,
}

impl ValuationWorkspace {
    pub fn new(stores: WorkspaceStores) -> Self {
        Self {
            stores,
            engine: Arc::new(DeterministicValuationEngine),
            remote: None,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            scope: CaseScope::new(),
            state: RwLock::new(WorkspaceState::default()),
        }
    }

    pub fn with_remote(
        mut self,
        service: Arc<dyn RemoteValuationService>,
        timeout: Duration,
    ) -> Self {
        self.remote = Some(service);
        self.remote_timeout = timeout;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn ValuationEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn scope(&self) -> &CaseScope {
        &self.scope
    }

    pub async fn select_case(&self, case_id: &CaseId) -> Result<ValuationForm, ApplicationError> {
        let token = self.scope.activate(case_id.clone());
        *self.state.write().await = WorkspaceState::default();

        let case = self
            .stores
            .cases
            .find_by_id(case_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::CaseNotFound(case_id.0.clone()))?;
        let elements = self.stores.elements.list_by_case(case_id).await.map_err(persistence)?;

        let mut form = ValuationForm::new();
        form.prefill_from_case(&case);

        let mut state = self.state.write().await;
        if !token.is_current() {
            return Err(ApplicationError::StaleCase(case_id.0.clone()));
        }
        info!(
            event_name = "workspace.case.selected",
            case_id = %case_id,
            element_count = elements.len(),
            "case selected for valuation"
        );
        *state = WorkspaceState { case: Some(case), elements, valuation: None, policy_limit: None };

        Ok(form)
    }

    pub async fn active_case(&self) -> Option<CaseRecord> {
        self.state.read().await.case.clone()
    }

    pub async fn elements(&self) -> Vec<DamageElement> {
        self.state.read().await.elements.clone()
    }

    pub async fn damage_summary(&self) -> DamageSummary {
        let state = self.state.read().await;
        DamageAggregator::new(&state.elements).summary()
    }

    pub async fn grouped_elements(&self) -> Vec<CategoryGroup> {
        let state = self.state.read().await;
        DamageAggregator::new(&state.elements).grouped()
    }

    pub async fn create_element(
        &self,
        draft: DamageElementDraft,
    ) -> Result<DamageElement, ApplicationError> {
        let (token, case_id) = self.active_token()?;
        draft.validate()?;
        let created = self.stores.elements.create(&case_id, draft).await.map_err(persistence)?;
        self.reload_elements(&token, &case_id).await?;
        Ok(created)
    }

    pub async fn update_element(
        &self,
        id: &DamageElementId,
        draft: DamageElementDraft,
    ) -> Result<DamageElement, ApplicationError> {
        let (token, case_id) = self.active_token()?;
        draft.validate()?;
        let updated = self.stores.elements.update(id, draft).await.map_err(persistence)?;
        self.reload_elements(&token, &case_id).await?;
        Ok(updated)
    }

    pub async fn delete_element(&self, id: &DamageElementId) -> Result<(), ApplicationError> {
        let (token, case_id) = self.active_token()?;
        self.stores.elements.delete(id).await.map_err(persistence)?;
        self.reload_elements(&token, &case_id).await
    }

    pub async fn sync_medical_expenses(&self) -> Result<Option<DamageElement>, ApplicationError> {
        let (token, case_id) = self.active_token()?;
        let synced =
            self.stores.elements.sync_medical_expenses(&case_id).await.map_err(persistence)?;
        self.reload_elements(&token, &case_id).await?;
        Ok(synced)
    }

    /// Pulls the authoritative economic figures into `form`. Returns the
    /// fields that were written.
    pub async fn reconcile(
        &self,
        form: &mut ValuationForm,
    ) -> Result<Vec<FormField>, ApplicationError> {
        let (_, case_id) = self.active_token()?;
        let records =
            self.stores.medical_records.list_by_case(&case_id).await.map_err(persistence)?;
        let figures = {
            let state = self.state.read().await;
            ReconciliationEngine::reconcile(&records, &state.elements)
        };

        let written = figures.apply_to(form);
        debug!(
            event_name = "workspace.reconcile.applied",
            case_id = %case_id,
            medical_source = ?figures.medical_source,
            fields_written = written.len(),
            "reconciled economic figures"
        );
        Ok(written)
    }

    /// Values the form for the active case. The remote service is tried first
    /// when configured; any failure falls back to the local formula.
    pub async fn calculate(&self, form: &ValuationForm) -> Result<CaseValuation, ApplicationError> {
        let (token, case_id) = self.active_token()?;
        let input = form.to_input();

        let damage_summary = {
            let state = self.state.read().await;
            DamageAggregator::new(&state.elements).summary()
        };
        ValuationPrecondition::check(&input, damage_summary.economic_total)?;

        let local = self.engine.value(&input).for_case(case_id.clone());
        let valuation = match &self.remote {
            Some(service) => match self.compute_remote(service.as_ref(), &input, &token).await {
                Ok(remote) => remote.for_case(case_id.clone()),
                Err(RemoteServiceError::Cancelled) => {
                    debug!(
                        event_name = "valuation.remote.cancelled",
                        case_id = %case_id,
                        "remote valuation cancelled by case switch"
                    );
                    return Err(ApplicationError::StaleCase(case_id.0.clone()));
                }
                Err(error) => {
                    warn!(
                        event_name = "valuation.remote.fallback",
                        case_id = %case_id,
                        reason = error.reason_code(),
                        error = %error,
                        "remote valuation failed; using local formula"
                    );
                    local
                }
            },
            None => local,
        };

        {
            let mut state = self.state.write().await;
            if !token.is_current() {
                debug!(
                    event_name = "valuation.result.discarded",
                    case_id = %case_id,
                    "discarding valuation for a case that is no longer active"
                );
                return Err(ApplicationError::StaleCase(case_id.0.clone()));
            }
            state.valuation = Some(valuation.clone());
            state.policy_limit = input.policy_limit;
        }

        info!(
            event_name = "valuation.completed",
            case_id = %case_id,
            source = ?valuation.source,
            total_case_value = %valuation.total_case_value,
            realistic_recovery = %valuation.realistic_recovery,
            "case valuation completed"
        );

        self.persist(&case_id, damage_summary, &valuation).await;
        Ok(valuation)
    }

    pub async fn current_valuation(&self) -> Option<CaseValuation> {
        self.state.read().await.valuation.clone()
    }

    /// `None` until a valuation with a settlement range has been committed.
    pub async fn range_display(&self) -> Option<RangeView> {
        let state = self.state.read().await;
        let estimate = state.valuation.as_ref()?.settlement_range?;
        let range = synthesize_range(estimate);
        Some(RangeView {
            range,
            policy_limit_position: policy_limit_position(state.policy_limit, range.high),
        })
    }

    /// Settlement analysis saved with the last calculation for the active
    /// case, without recomputing it.
    pub async fn stored_valuation(&self) -> Result<Option<CaseValuation>, ApplicationError> {
        let (_, case_id) = self.active_token()?;
        let snapshot = self.stores.calculations.fetch(&case_id).await.map_err(persistence)?;
        Ok(snapshot.and_then(|calculation| calculation.settlement_analysis))
    }

    pub async fn history(&self) -> Result<Vec<SettlementHistoryEntry>, ApplicationError> {
        let (_, case_id) = self.active_token()?;
        self.stores.history.list_by_case(&case_id).await.map_err(persistence)
    }

    async fn compute_remote(
        &self,
        service: &dyn RemoteValuationService,
        input: &CaseValuationInput,
        token: &CaseToken,
    ) -> Result<CaseValuation, RemoteServiceError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(RemoteServiceError::Cancelled),
            outcome = evaluate_within(service, input, self.remote_timeout) => outcome,
        }
    }

    async fn reload_elements(
        &self,
        token: &CaseToken,
        case_id: &CaseId,
    ) -> Result<(), ApplicationError> {
        let elements = self.stores.elements.list_by_case(case_id).await.map_err(persistence)?;
        let mut state = self.state.write().await;
        if !token.is_current() {
            return Err(ApplicationError::StaleCase(case_id.0.clone()));
        }
        state.elements = elements;
        Ok(())
    }

    /// Snapshot and history writes never fail the calculation.
    async fn persist(&self, case_id: &CaseId, summary: DamageSummary, valuation: &CaseValuation) {
        let now = Utc::now();
        let snapshot = DamageCalculation {
            case_id: case_id.clone(),
            economic_total: summary.economic_total,
            non_economic_total: summary.non_economic_total,
            grand_total: summary.grand_total,
            settlement_analysis: Some(valuation.clone()),
            updated_at: now,
        };

        if let Err(error) = self.stores.calculations.save(snapshot).await {
            warn!(
                event_name = "valuation.persist.failed",
                case_id = %case_id,
                target = "damage_calculation",
                error = %error,
                "failed to save settlement analysis"
            );
        }

        let entry = SettlementHistoryEntry {
            case_id: case_id.clone(),
            valuation: valuation.clone(),
            recorded_at: now,
        };
        if let Err(error) = self.stores.history.append(entry).await {
            warn!(
                event_name = "valuation.persist.failed",
                case_id = %case_id,
                target = "settlement_history",
                error = %error,
                "failed to append settlement history"
            );
        }
    }

    fn active_token(&self) -> Result<(CaseToken, CaseId), ApplicationError> {
        let token = self.scope.token();
        let case_id = token.case_id().cloned().ok_or(ApplicationError::NoActiveCase)?;
        Ok((token, case_id))
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use caseworth_core::damages::{CategoryGroupKey, FormField, ValuationForm};
    use caseworth_core::domain::case::{CaseId, CaseRecord, MedicalRecordEntry, MedicalRecordId};
    use caseworth_core::domain::damage::{DamageElementDraft, DamageElementType};
    use caseworth_core::domain::valuation::{
        CaseValuation, CaseValuationInput, DamageCalculation, ValuationSource,
    };
    use caseworth_core::errors::{ApplicationError, RemoteServiceError};
    use caseworth_core::valuation::{
        compute_local, RemoteCalculation, RemoteValuationRequest, RemoteValuationResponse,
        RemoteValuationService, ValuationEngine,
    };
    use caseworth_db::repositories::{
        CaseRecordRepository, DamageCalculationRepository, InMemoryCaseRecordRepository,
        InMemoryMedicalRecordRepository, MedicalRecordRepository, MemoryTables, RepositoryError,
    };

    use super::{ValuationWorkspace, WorkspaceStores};

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    struct ScriptedRemote {
        outcome: Result<RemoteValuationResponse, RemoteServiceError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedRemote {
        fn new(outcome: Result<RemoteValuationResponse, RemoteServiceError>) -> Self {
            Self { outcome, delay: Duration::ZERO, calls: AtomicUsize::new(0) }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl RemoteValuationService for ScriptedRemote {
        async fn evaluate(
            &self,
            _request: &RemoteValuationRequest,
        ) -> Result<RemoteValuationResponse, RemoteServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    struct FlatRecoveryEngine;

    impl ValuationEngine for FlatRecoveryEngine {
        fn value(&self, input: &CaseValuationInput) -> CaseValuation {
            CaseValuation { realistic_recovery: dec(1), ..compute_local(input) }
        }
    }

    struct FailingCalculations;

    #[async_trait]
    impl DamageCalculationRepository for FailingCalculations {
        async fn fetch(
            &self,
            _case_id: &CaseId,
        ) -> Result<Option<DamageCalculation>, RepositoryError> {
            Ok(None)
        }

        async fn save(&self, _calculation: DamageCalculation) -> Result<(), RepositoryError> {
            Err(RepositoryError::Decode("disk full".to_string()))
        }
    }

    fn remote_success() -> RemoteValuationResponse {
        RemoteValuationResponse {
            success: true,
            calculation: Some(RemoteCalculation {
                economic_damages: Some(dec(15_000)),
                non_economic_damages: Some(dec(45_000)),
                total_case_value: Some(dec(60_000)),
                recommended_multiplier: Some(dec(3)),
                realistic_recovery: Some(dec(50_000)),
                settlement_range_low: Some(dec(35_000)),
                settlement_range_high: Some(dec(70_000)),
                case_strength: Some(dec(8)),
                key_factors: vec!["clear liability".to_string()],
                ..RemoteCalculation::default()
            }),
            error: None,
        }
    }

    async fn seeded_tables() -> Arc<MemoryTables> {
        let tables = MemoryTables::shared();
        let cases = InMemoryCaseRecordRepository::new(tables.clone());
        for (id, injury, limit) in
            [("CASE-1", "whiplash", Some(dec(100_000))), ("CASE-2", "fracture", None)]
        {
            cases
                .save(CaseRecord {
                    id: CaseId(id.to_string()),
                    title: format!("{id} v. Defendant"),
                    injury_type: Some(injury.to_string()),
                    default_multiplier: None,
                    policy_limit: limit,
                    created_at: Utc::now(),
                })
                .await
                .expect("seed case");
        }
        tables
    }

    async fn workspace() -> ValuationWorkspace {
        ValuationWorkspace::new(WorkspaceStores::in_memory(seeded_tables().await))
    }

    fn case_id(id: &str) -> CaseId {
        CaseId(id.to_string())
    }

    fn filled_form(mut form: ValuationForm) -> ValuationForm {
        form.set_field(FormField::MedicalExpenses, dec(10_000));
        form.set_field(FormField::LostWages, dec(5_000));
        form
    }

    #[tokio::test]
    async fn calculate_requires_an_active_case() {
        let workspace = workspace().await;
        let error = workspace.calculate(&ValuationForm::new()).await.expect_err("no case");
        assert_eq!(error, ApplicationError::NoActiveCase);
    }

    #[tokio::test]
    async fn selecting_unknown_case_is_reported() {
        let workspace = workspace().await;
        let error = workspace.select_case(&case_id("CASE-404")).await.expect_err("unknown");
        assert_eq!(error, ApplicationError::CaseNotFound("CASE-404".to_string()));
    }

    #[tokio::test]
    async fn all_zero_form_is_refused_with_missing_fields() {
        let workspace = workspace().await;
        let form = workspace.select_case(&case_id("CASE-1")).await.expect("select");

        let error = workspace.calculate(&form).await.expect_err("all zero");
        assert_eq!(error.error_class(), "validation");
        assert!(error.to_string().contains("medical_expenses, lost_wages, future_medical"));
        assert!(workspace.current_valuation().await.is_none());
    }

    #[tokio::test]
    async fn local_calculation_is_committed_and_persisted() {
        let workspace = workspace().await;
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let valuation = workspace.calculate(&form).await.expect("calculate");

        assert_eq!(valuation.source, ValuationSource::Local);
        assert_eq!(valuation.multiplier, Decimal::new(20, 1));
        assert_eq!(valuation.total_case_value, dec(45_000));
        assert_eq!(valuation.case_id, Some(case_id("CASE-1")));
        assert_eq!(workspace.current_valuation().await, Some(valuation.clone()));

        let stored = workspace.stored_valuation().await.expect("stored").expect("snapshot");
        assert!(stored.same_figures(&valuation));
        assert_eq!(workspace.history().await.expect("history").len(), 1);
    }

    #[tokio::test]
    async fn prefill_uses_case_policy_limit() {
        let workspace = workspace().await;
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));
        assert_eq!(form.values().policy_limit, Some(dec(100_000)));
        assert_eq!(form.values().injury_type, "whiplash");
    }

    #[tokio::test]
    async fn remote_success_replaces_local_result() {
        let remote = Arc::new(ScriptedRemote::new(Ok(remote_success())));
        let workspace = workspace().await.with_remote(remote.clone(), Duration::from_secs(5));
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let valuation = workspace.calculate(&form).await.expect("calculate");

        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        assert_eq!(valuation.source, ValuationSource::Remote);
        assert_eq!(valuation.realistic_recovery, dec(50_000));
        let insights = valuation.insights.expect("remote insights");
        assert_eq!(insights.case_strength, Some(dec(8)));

        let view = workspace.range_display().await.expect("range view");
        assert_eq!(view.range.low, dec(35_000));
        assert_eq!(view.range.mid, dec(50_000));
        assert_eq!(view.range.high, dec(70_000));
        assert_eq!(view.policy_limit_position, dec(100));
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_local_formula() {
        let remote = Arc::new(ScriptedRemote::new(Err(RemoteServiceError::Status(502))));
        let workspace = workspace().await.with_remote(remote, Duration::from_secs(5));
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let valuation = workspace.calculate(&form).await.expect("calculate");
        let expected = compute_local(&form.to_input());

        assert_eq!(valuation.source, ValuationSource::Local);
        assert!(valuation.same_figures(&expected));
        assert!(workspace.range_display().await.is_none(), "local path has no range");
    }

    #[tokio::test]
    async fn rejected_payload_falls_back_to_local_formula() {
        let mut response = remote_success();
        if let Some(calculation) = response.calculation.as_mut() {
            calculation.case_strength = Some(dec(42));
        }
        let remote = Arc::new(ScriptedRemote::new(Ok(response)));
        let workspace = workspace().await.with_remote(remote, Duration::from_secs(5));
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let valuation = workspace.calculate(&form).await.expect("calculate");
        assert_eq!(valuation.source, ValuationSource::Local);
    }

    #[tokio::test]
    async fn overflowing_remote_figures_fall_back_to_local_formula() {
        let response = RemoteValuationResponse {
            success: true,
            calculation: Some(RemoteCalculation {
                economic_damages: Some(Decimal::new(1, 19)),
                non_economic_damages: Some(Decimal::MAX),
                total_case_value: Some(Decimal::MAX),
                realistic_recovery: Some(dec(1)),
                ..RemoteCalculation::default()
            }),
            error: None,
        };
        let remote = Arc::new(ScriptedRemote::new(Ok(response)));
        let workspace = workspace().await.with_remote(remote, Duration::from_secs(5));
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let valuation = workspace.calculate(&form).await.expect("calculate");
        assert_eq!(valuation.source, ValuationSource::Local);
        assert!(valuation.same_figures(&compute_local(&form.to_input())));
    }

    #[tokio::test]
    async fn custom_engine_replaces_local_formula() {
        let workspace = workspace().await.with_engine(Arc::new(FlatRecoveryEngine));
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let valuation = workspace.calculate(&form).await.expect("calculate");
        assert_eq!(valuation.realistic_recovery, dec(1));
        assert_eq!(valuation.case_id, Some(case_id("CASE-1")));
    }

    #[tokio::test]
    async fn grouped_elements_follow_category_buckets() {
        let workspace = workspace().await;
        workspace.select_case(&case_id("CASE-1")).await.expect("select");
        for (element_type, amount) in [
            (DamageElementType::PastMedical, 2_000),
            (DamageElementType::PastMedical, 500),
            (DamageElementType::Mileage, 80),
        ] {
            workspace
                .create_element(DamageElementDraft::new(element_type, dec(amount)))
                .await
                .expect("create");
        }

        let groups = workspace.grouped_elements().await;
        assert_eq!(groups[0].key, CategoryGroupKey::PastMedical);
        assert_eq!((groups[0].elements.len(), groups[0].total), (2, dec(2_500)));
        let other = groups.last().expect("other group");
        assert_eq!(other.key, CategoryGroupKey::Other);
        assert_eq!(other.total, dec(80));
    }

    #[tokio::test]
    async fn slow_remote_times_out_and_falls_back() {
        let remote = Arc::new(
            ScriptedRemote::new(Ok(remote_success())).delayed(Duration::from_secs(2)),
        );
        let workspace = workspace().await.with_remote(remote, Duration::from_millis(50));
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let valuation = workspace.calculate(&form).await.expect("calculate");
        assert_eq!(valuation.source, ValuationSource::Local);
    }

    #[tokio::test]
    async fn case_switch_discards_in_flight_remote_result() {
        let remote = Arc::new(
            ScriptedRemote::new(Ok(remote_success())).delayed(Duration::from_millis(500)),
        );
        let workspace = Arc::new(workspace().await.with_remote(remote, Duration::from_secs(5)));
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let in_flight = {
            let workspace = Arc::clone(&workspace);
            tokio::spawn(async move { workspace.calculate(&form).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        workspace.select_case(&case_id("CASE-2")).await.expect("switch case");

        let outcome = tokio::time::timeout(Duration::from_millis(300), in_flight)
            .await
            .expect("cancellation should not wait for the remote call")
            .expect("calculation task");

        assert_eq!(outcome, Err(ApplicationError::StaleCase("CASE-1".to_string())));
        assert!(workspace.current_valuation().await.is_none());
        assert_eq!(workspace.active_case().await.map(|case| case.id), Some(case_id("CASE-2")));
        assert!(workspace.history().await.expect("history").is_empty());
    }

    #[tokio::test]
    async fn selecting_a_case_resets_previous_valuation() {
        let workspace = workspace().await;
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));
        workspace.calculate(&form).await.expect("calculate");

        workspace.select_case(&case_id("CASE-2")).await.expect("switch");
        assert!(workspace.current_valuation().await.is_none());
        assert!(workspace.elements().await.is_empty());
    }

    #[tokio::test]
    async fn element_mutations_reload_from_the_store() {
        let workspace = workspace().await;
        workspace.select_case(&case_id("CASE-1")).await.expect("select");

        let created = workspace
            .create_element(DamageElementDraft::new(DamageElementType::LostWages, dec(4_000)))
            .await
            .expect("create");
        assert_eq!(workspace.elements().await.len(), 1);

        workspace
            .update_element(
                &created.id,
                DamageElementDraft::new(DamageElementType::LostWages, dec(4_500)),
            )
            .await
            .expect("update");
        assert_eq!(workspace.damage_summary().await.economic_total, dec(4_500));

        workspace.delete_element(&created.id).await.expect("delete");
        assert!(workspace.elements().await.is_empty());
    }

    #[tokio::test]
    async fn negative_element_amounts_are_refused() {
        let workspace = workspace().await;
        workspace.select_case(&case_id("CASE-1")).await.expect("select");

        let error = workspace
            .create_element(DamageElementDraft::new(DamageElementType::OutOfPocket, dec(-1)))
            .await
            .expect_err("negative");
        assert_eq!(error.error_class(), "validation");
    }

    #[tokio::test]
    async fn reconcile_prefers_larger_medical_source_and_keeps_manual_entries() {
        let tables = seeded_tables().await;
        let records = InMemoryMedicalRecordRepository::new(tables.clone());
        for (id, amount) in [("MR-1", 2_000), ("MR-2", 3_000)] {
            records
                .add(MedicalRecordEntry {
                    id: MedicalRecordId(id.to_string()),
                    case_id: case_id("CASE-1"),
                    provider: "Clinic".to_string(),
                    billed_amount: Some(dec(amount)),
                })
                .await
                .expect("add record");
        }

        let workspace = ValuationWorkspace::new(WorkspaceStores::in_memory(tables));
        let mut form = workspace.select_case(&case_id("CASE-1")).await.expect("select");
        form.set_field(FormField::FutureMedical, dec(1_200));
        workspace
            .create_element(DamageElementDraft::new(DamageElementType::PastMedical, dec(3_000)))
            .await
            .expect("create");

        let written = workspace.reconcile(&mut form).await.expect("reconcile");

        assert_eq!(written, vec![FormField::MedicalExpenses]);
        assert_eq!(form.field(FormField::MedicalExpenses), dec(5_000));
        assert_eq!(form.field(FormField::FutureMedical), dec(1_200));
    }

    #[tokio::test]
    async fn element_economic_total_satisfies_precondition() {
        let workspace = workspace().await;
        let form = workspace.select_case(&case_id("CASE-2")).await.expect("select");
        workspace
            .create_element(DamageElementDraft::new(DamageElementType::PropertyDamage, dec(900)))
            .await
            .expect("create");

        let valuation = workspace.calculate(&form).await.expect("elements count as evidence");
        assert_eq!(valuation.economic_damages, Decimal::ZERO);
    }

    #[tokio::test]
    async fn sync_medical_expenses_reloads_elements() {
        let tables = seeded_tables().await;
        InMemoryMedicalRecordRepository::new(tables.clone())
            .add(MedicalRecordEntry {
                id: MedicalRecordId("MR-1".to_string()),
                case_id: case_id("CASE-2"),
                provider: "Orthopedics".to_string(),
                billed_amount: Some(dec(7_500)),
            })
            .await
            .expect("add record");
        let workspace = ValuationWorkspace::new(WorkspaceStores::in_memory(tables));
        workspace.select_case(&case_id("CASE-2")).await.expect("select");

        let synced = workspace.sync_medical_expenses().await.expect("sync").expect("element");

        assert_eq!(synced.effective_amount(), dec(7_500));
        assert_eq!(workspace.elements().await, vec![synced]);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_the_calculation() {
        let stores = WorkspaceStores {
            calculations: Arc::new(FailingCalculations),
            ..WorkspaceStores::in_memory(seeded_tables().await)
        };
        let workspace = ValuationWorkspace::new(stores);
        let form = filled_form(workspace.select_case(&case_id("CASE-1")).await.expect("select"));

        let valuation = workspace.calculate(&form).await.expect("calculate");

        assert_eq!(workspace.current_valuation().await, Some(valuation));
        assert_eq!(workspace.history().await.expect("history").len(), 1);
    }
}
