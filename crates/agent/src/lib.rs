pub mod remote;
pub mod scope;
pub mod workspace;

pub use remote::{evaluate_within, HttpValuationClient};
pub use scope::{CaseScope, CaseToken};
pub use workspace::{RangeView, ValuationWorkspace, WorkspaceStores, DEFAULT_REMOTE_TIMEOUT};
