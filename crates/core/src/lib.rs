pub mod config;
pub mod damages;
pub mod domain;
pub mod errors;
pub mod valuation;

pub use damages::{
    CategoryGroup, CategoryGroupKey, DamageAggregator, DamageSummary, FormField, MedicalSource,
    ReconciledFigures, ReconciliationEngine, ValuationForm,
};
pub use domain::case::{CaseId, CaseRecord, MedicalRecordEntry, MedicalRecordId};
pub use domain::damage::{
    ConfidenceLevel, DamageElement, DamageElementDraft, DamageElementId, DamageElementType,
};
pub use domain::valuation::{
    CaseValuation, CaseValuationInput, DamageCalculation, LiabilityAssessment, RemoteInsights,
    SettlementEstimate, SettlementHistoryEntry, ValuationSource,
};
pub use errors::{ApplicationError, DomainError, RemoteServiceError, ValidationError};
pub use valuation::{
    compute_local, select_multiplier, synthesize_range, DeterministicValuationEngine,
    RawValuationInput, RemoteValuationRequest, RemoteValuationResponse, RemoteValuationService,
    SettlementRangeDisplay, ValuationEngine, ValuationPrecondition,
};
