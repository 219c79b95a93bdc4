use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CleanerError, ExecutorError};
use crate::jobs::{BatchSnapshot, JobSlot, WorkItem};

/// BatchExecutor runs a fixed list of deletion jobs with a configurable
/// concurrency limit and exposes their live state.
pub struct BatchExecutor<T: WorkItem> {
    items: Arc<[T]>,
    slots: Arc<[JobSlot]>,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    started_at: Instant,
    cancel: CancellationToken,
    dispatcher: JoinHandle<()>,
}

impl<T: WorkItem> BatchExecutor<T> {
    /// Create the executor and start dispatching `items` in order.
    ///
    /// `op` is called once per item with a child of the batch cancellation
    /// token. Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(
        items: Vec<T>,
        max_concurrent_jobs: usize,
        op: F,
    ) -> Result<Self, ExecutorError>
    where
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CleanerError>> + Send + 'static,
    {
        if items.is_empty() {
            return Err(ExecutorError::NoItems);
        }
        if max_concurrent_jobs == 0 {
            return Err(ExecutorError::ZeroConcurrency);
        }

        let items: Arc<[T]> = Arc::from(items);
        let slots: Arc<[JobSlot]> = (0..items.len()).map(|_| JobSlot::default()).collect();
        let semaphore = Arc::new(Semaphore::new(max_concurrent_jobs));
        let cancel = CancellationToken::new();

        info!(
            "Starting batch of {} jobs, max concurrent jobs: {}",
            items.len(),
            max_concurrent_jobs
        );

        let dispatcher = tokio::spawn(dispatch(
            items.clone(),
            slots.clone(),
            semaphore.clone(),
            cancel.clone(),
            Arc::new(op),
        ));

        Ok(Self {
            items,
            slots,
            semaphore,
            max_concurrent: max_concurrent_jobs,
            started_at: Instant::now(),
            cancel,
            dispatcher,
        })
    }

    /// Get the maximum number of concurrent jobs
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Get the number of available slots
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy the state of every job. Each job's state is read as a whole.
    pub fn snapshot(&self) -> BatchSnapshot<T> {
        let states = self.slots.iter().map(JobSlot::load).collect();
        BatchSnapshot::new(self.items.clone(), states, self.started_at.elapsed())
    }

    /// True once every job reached `Finished`, `Failed` or `Cancelled`.
    pub fn is_done(&self) -> bool {
        self.slots.iter().all(|slot| slot.load().is_terminal())
    }

    /// Stop dispatching; queued jobs become `Cancelled` and running jobs are
    /// signalled through their token.
    pub fn cancel(&self) {
        info!("Cancelling batch");
        self.cancel.cancel();
    }

    /// Wait until every job is terminal, checking every `interval`.
    pub async fn wait(&self, interval: Duration) -> BatchSnapshot<T> {
        loop {
            let snapshot = self.snapshot();
            if snapshot.is_done() {
                return snapshot;
            }
            tokio::time::sleep(interval).await;
        }
    }
}

impl<T: WorkItem> Drop for BatchExecutor<T> {
    fn drop(&mut self) {
        if !self.dispatcher.is_finished() {
            self.dispatcher.abort();
        }
    }
}

async fn dispatch<T, F, Fut>(
    items: Arc<[T]>,
    slots: Arc<[JobSlot]>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    op: Arc<F>,
) where
    T: WorkItem,
    F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CleanerError>> + Send + 'static,
{
    for (index, item) in items.iter().enumerate() {
        // Wait for a free slot unless the batch is cancelled first
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            let cancelled = slots[index..]
                .iter()
                .filter(|slot| slot.cancel_queued())
                .count();
            warn!("Dispatch stopped, {} queued jobs cancelled", cancelled);
            return;
        };

        if !slots[index].start() {
            continue;
        }
        debug!("Dispatching job {} ({})", index, item.id());

        let job = tokio::spawn(op(item.clone(), cancel.child_token()));
        let id = item.id().to_string();
        let worker_slots = slots.clone();
        tokio::spawn(async move {
            let result = match job.await {
                Ok(result) => result,
                Err(e) => Err(CleanerError::Worker(e.to_string())),
            };
            match &result {
                Ok(()) => debug!("Job {} finished", id),
                Err(e) => warn!("Job {} failed: {}", id, e),
            }
            worker_slots[index].complete(result);

            // Permit is released only once the state is terminal
            drop(permit);
        });
    }
    debug!("All jobs dispatched");
}
