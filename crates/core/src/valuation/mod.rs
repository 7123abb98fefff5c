pub mod calculator;
pub mod coerce;
pub mod range;
pub mod remote;

pub use calculator::{
    compute_local, compute_local_with_trace, select_multiplier, DeterministicValuationEngine,
    TracedValuation, ValuationEngine, ValuationPrecondition, ValuationTraceStep,
};
pub use coerce::RawValuationInput;
pub use range::{policy_limit_position, synthesize_range, SettlementRangeDisplay};
pub use remote::{
    RemoteCalculation, RemoteValuationRequest, RemoteValuationResponse, RemoteValuationService,
};
