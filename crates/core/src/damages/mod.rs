pub mod aggregate;
pub mod form;
pub mod reconcile;

pub use aggregate::{CategoryGroup, CategoryGroupKey, DamageAggregator, DamageSummary};
pub use form::{FormField, ValuationForm};
pub use reconcile::{MedicalSource, ReconciledFigures, ReconciliationEngine};
