//! Rules and the queue that batches them

use std::future::Future;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::EngineError;
use crate::pipeline::record::Outdated;
use crate::project::patterns::Patterns;
use crate::version::threshold::Policy;

/// Include patterns together with the policy applied to what they select
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub patterns: Patterns,
    pub policy: Policy,
}

impl Rule {
    pub fn new(patterns: impl Into<Patterns>, policy: impl Into<Policy>) -> Self {
        Self {
            patterns: patterns.into(),
            policy: policy.into(),
        }
    }
}

/// Outdated dependencies per rule of a batch, in enqueue order
pub type BatchResult = Result<Vec<Vec<Outdated>>, EngineError>;

/// Rules collected together and evaluated once.
///
/// Every caller holding the same batch receives the same result.
#[derive(Debug, Default)]
pub struct Batch {
    result: OnceCell<BatchResult>,
}

impl Batch {
    /// Result of this batch, running `evaluate` if no caller has yet
    pub async fn result<F, Fut>(&self, evaluate: F) -> BatchResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BatchResult>,
    {
        self.result.get_or_init(evaluate).await.clone()
    }
}

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing queued
    #[default]
    Idle,
    /// Rules are being queued for the next drain
    Collecting,
    /// A batch has been taken and is being evaluated
    Draining,
}

#[derive(Debug, Default)]
struct QueueState {
    phase: Phase,
    pending: Vec<Rule>,
    batch: Arc<Batch>,
}

/// Rules queued between registration and the next drain.
///
/// The first rule pushed outside a collecting phase opens a new batch. A rule
/// pushed while a batch is draining never joins it.
#[derive(Debug, Default)]
pub struct RuleQueue {
    state: Mutex<QueueState>,
}

impl RuleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    pub fn push(&self, rule: Rule) {
        let mut state = self.lock();
        if state.phase != Phase::Collecting {
            debug!("Collecting a new batch of rules");
            state.phase = Phase::Collecting;
            state.batch = Arc::new(Batch::default());
        }
        state.pending.push(rule);
    }

    /// Batch being collected, or an empty one when nothing is
    pub fn batch(&self) -> Arc<Batch> {
        let state = self.lock();
        if state.phase == Phase::Collecting {
            state.batch.clone()
        } else {
            Arc::new(Batch::default())
        }
    }

    /// Take the rules of `batch`, in enqueue order.
    ///
    /// Empty unless `batch` is the one being collected.
    pub fn drain(&self, batch: &Arc<Batch>) -> Vec<Rule> {
        let mut state = self.lock();
        if state.phase != Phase::Collecting || !Arc::ptr_eq(&state.batch, batch) {
            return Vec::new();
        }
        state.phase = Phase::Draining;
        mem::take(&mut state.pending)
    }

    /// Mark `batch` as evaluated
    pub fn finish(&self, batch: &Arc<Batch>) {
        let mut state = self.lock();
        if state.phase == Phase::Draining && Arc::ptr_eq(&state.batch, batch) {
            state.phase = Phase::Idle;
        }
    }
}
