use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::CleanerError;

/// One object slated for deletion.
pub trait WorkItem: Clone + Send + Sync + 'static {
    /// Stable identifier, also used as the display line key.
    fn id(&self) -> &str;

    /// Human readable label fitting in `max_width` display columns.
    fn label(&self, max_width: usize) -> String;
}

/// Lifecycle of a single deletion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Started { started_at: Instant },
    Finished,
    Failed(CleanerError),
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Failed(_) | JobState::Cancelled
        )
    }

    pub fn is_started(&self) -> bool {
        matches!(self, JobState::Started { .. })
    }
}

/// Shared cell holding the state of one job.
///
/// Written by the worker owning the job and read by the display loop. The
/// whole state value is swapped under the lock so a reader never sees a
/// state without its timestamp.
#[derive(Debug)]
pub struct JobSlot {
    state: Mutex<JobState>,
}

impl Default for JobSlot {
    fn default() -> Self {
        Self {
            state: Mutex::new(JobState::Queued),
        }
    }
}

impl JobSlot {
    pub fn load(&self) -> JobState {
        self.state.lock().clone()
    }

    /// `Queued -> Started`. Returns false if the job already left the queue.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if *state != JobState::Queued {
            warn!("Refusing to start a job in state {:?}", *state);
            return false;
        }
        *state = JobState::Started {
            started_at: Instant::now(),
        };
        true
    }

    /// `Started -> Finished | Failed | Cancelled` from the operation's result.
    pub fn complete(&self, result: Result<(), CleanerError>) -> bool {
        let mut state = self.state.lock();
        if !state.is_started() {
            warn!("Refusing to complete a job in state {:?}", *state);
            return false;
        }
        *state = match result {
            Ok(()) => JobState::Finished,
            Err(CleanerError::Cancelled) => JobState::Cancelled,
            Err(e) => JobState::Failed(e),
        };
        true
    }

    /// `Queued -> Cancelled`, used when the batch is cancelled before dispatch.
    pub fn cancel_queued(&self) -> bool {
        let mut state = self.state.lock();
        if *state != JobState::Queued {
            return false;
        }
        *state = JobState::Cancelled;
        true
    }
}

/// Immutable point-in-time view of a batch.
#[derive(Debug, Clone)]
pub struct BatchSnapshot<T> {
    items: Arc<[T]>,
    states: Vec<JobState>,
    pub total: usize,
    pub completed: usize,
    pub elapsed: Duration,
}

impl<T> BatchSnapshot<T> {
    pub(crate) fn new(items: Arc<[T]>, states: Vec<JobState>, elapsed: Duration) -> Self {
        let completed = states.iter().filter(|s| s.is_terminal()).count();
        Self {
            total: states.len(),
            items,
            states,
            completed,
            elapsed,
        }
    }

    /// Jobs in input order.
    pub fn jobs(&self) -> impl Iterator<Item = (&T, &JobState)> {
        self.items.iter().zip(self.states.iter())
    }

    pub fn state(&self, index: usize) -> Option<&JobState> {
        self.states.get(index)
    }

    pub fn started(&self) -> usize {
        self.states.iter().filter(|s| s.is_started()).count()
    }

    pub fn is_done(&self) -> bool {
        self.completed == self.total
    }

    /// Every failed job with its error, in input order.
    pub fn failures(&self) -> Vec<(&T, &CleanerError)> {
        self.jobs()
            .filter_map(|(item, state)| match state {
                JobState::Failed(e) => Some((item, e)),
                _ => None,
            })
            .collect()
    }
}
