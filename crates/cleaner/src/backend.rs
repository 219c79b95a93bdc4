// Remote object backends
//
// A backend knows how to list every object, list the objects that must be
// kept, and delete one object through an asynchronous job that is polled
// until it reaches a terminal status.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CleanerError;
use crate::jobs::WorkItem;

/// Identifier of a deletion job on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteHandle(pub String);

/// Status of a deletion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStatus {
    Pending,
    Complete,
    Failed { reason: String },
}

#[async_trait]
pub trait RemoteBackend: Send + Sync + 'static {
    type Item: WorkItem;

    /// Every object known to the server.
    async fn list_all(&self) -> Result<Vec<Self::Item>, CleanerError>;

    /// Identifiers of the objects that must survive.
    async fn list_keep(&self) -> Result<Vec<String>, CleanerError>;

    async fn submit_delete(&self, item: &Self::Item) -> Result<DeleteHandle, CleanerError>;

    async fn poll_status(&self, handle: &DeleteHandle) -> Result<DeleteStatus, CleanerError>;

    /// Plural name of the objects, used in messages ("rooms", "medias").
    fn noun(&self) -> &'static str;

    /// Advice printed once a batch completed.
    fn completion_hint(&self) -> Option<&'static str> {
        None
    }
}

/// Delete one item: submit the job once, then poll it every `poll_interval`
/// until it is terminal.
///
/// Any error ends the job; there is no retry. Cancellation is observed
/// between polls.
pub async fn delete_until_terminal<B: RemoteBackend + ?Sized>(
    backend: &B,
    item: &B::Item,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> Result<(), CleanerError> {
    if cancel.is_cancelled() {
        return Err(CleanerError::Cancelled);
    }

    let handle = backend.submit_delete(item).await?;
    debug!("Deletion of {} submitted as {}", item.id(), handle.0);

    loop {
        if cancel.is_cancelled() {
            return Err(CleanerError::Cancelled);
        }

        match backend.poll_status(&handle).await? {
            DeleteStatus::Complete => return Ok(()),
            DeleteStatus::Failed { reason } => {
                return Err(CleanerError::RemoteOperationFailed(reason))
            }
            DeleteStatus::Pending => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(CleanerError::Cancelled),
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}
