use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use caseworth_core::domain::case::CaseId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ActiveCase {
    generation: u64,
    case_id: Option<CaseId>,
}

struct ScopeInner {
    generation: AtomicU64,
    signal: watch::Sender<ActiveCase>,
}

/// Tracks which case is active. Switching cases invalidates every token
/// handed out for the previous one and wakes anything awaiting
/// [`CaseToken::cancelled`].
#[derive(Clone)]
pub struct CaseScope {
    inner: Arc<ScopeInner>,
}

impl Default for CaseScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseScope {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(ActiveCase::default());
        Self { inner: Arc::new(ScopeInner { generation: AtomicU64::new(0), signal }) }
    }

    pub fn activate(&self, case_id: CaseId) -> CaseToken {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.signal.send_replace(ActiveCase { generation, case_id: Some(case_id) });
        self.token()
    }

    /// Token for whatever case is active right now.
    pub fn token(&self) -> CaseToken {
        let receiver = self.inner.signal.subscribe();
        let (generation, case_id) = {
            let active = receiver.borrow();
            (active.generation, active.case_id.clone())
        };
        CaseToken { generation, case_id, inner: Arc::clone(&self.inner), receiver }
    }

    pub fn active_case(&self) -> Option<CaseId> {
        self.inner.signal.borrow().case_id.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct CaseToken {
    generation: u64,
    case_id: Option<CaseId>,
    inner: Arc<ScopeInner>,
    receiver: watch::Receiver<ActiveCase>,
}

impl CaseToken {
    pub fn case_id(&self) -> Option<&CaseId> {
        self.case_id.as_ref()
    }

    pub fn is_current(&self) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == self.generation
    }

    /// Resolves once a different case has been activated.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if !self.is_current() {
                return;
            }
            if receiver.changed().await.is_err() {
                // The sender lives in `inner`, which this token keeps alive.
                std::future::pending::<()>().await;
            }
        }
    }
}
