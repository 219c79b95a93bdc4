#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use synapse_cleaner::{CleanerError, DeleteHandle, DeleteStatus, RemoteBackend, WorkItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obj {
    pub id: String,
}

impl Obj {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl WorkItem for Obj {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self, max_width: usize) -> String {
        self.id.chars().take(max_width).collect()
    }
}

pub fn objs(ids: &[&str]) -> Vec<Obj> {
    ids.iter().map(|id| Obj::new(id)).collect()
}

/// In-memory backend whose deletions complete after a fixed number of polls.
#[derive(Default)]
pub struct FakeBackend {
    pub all: Vec<Obj>,
    pub keep: Vec<String>,
    pending_polls: usize,
    rejected: Vec<String>,
    failing: HashMap<String, String>,
    stuck: bool,
    submitted: Mutex<Vec<String>>,
    polls: Arc<Mutex<HashMap<String, usize>>>,
}

/// Poll counts per deletion handle, shared with the backend.
pub type PollLog = Arc<Mutex<HashMap<String, usize>>>;

impl FakeBackend {
    pub fn new(all: &[&str], keep: &[&str]) -> Self {
        Self {
            all: objs(all),
            keep: keep.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Report `Pending` this many times before `Complete`.
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Refuse the submission of `id` with a 500.
    pub fn reject_submit(mut self, id: &str) -> Self {
        self.rejected.push(id.to_string());
        self
    }

    /// Report the deletion of `id` as failed with `reason`.
    pub fn fail_with(mut self, id: &str, reason: &str) -> Self {
        self.failing.insert(id.to_string(), reason.to_string());
        self
    }

    /// Never complete any deletion.
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Ids whose deletion was submitted, in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }

    pub fn polls_of(&self, id: &str) -> usize {
        self.polls.lock().get(id).copied().unwrap_or(0)
    }

    /// Poll counts that stay readable after the backend is moved away.
    pub fn poll_log(&self) -> PollLog {
        self.polls.clone()
    }
}

#[async_trait]
impl RemoteBackend for FakeBackend {
    type Item = Obj;

    async fn list_all(&self) -> Result<Vec<Obj>, CleanerError> {
        Ok(self.all.clone())
    }

    async fn list_keep(&self) -> Result<Vec<String>, CleanerError> {
        Ok(self.keep.clone())
    }

    async fn submit_delete(&self, item: &Obj) -> Result<DeleteHandle, CleanerError> {
        self.submitted.lock().push(item.id.clone());
        if self.rejected.contains(&item.id) {
            return Err(CleanerError::RemoteRejected {
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(DeleteHandle(item.id.clone()))
    }

    async fn poll_status(&self, handle: &DeleteHandle) -> Result<DeleteStatus, CleanerError> {
        let mut polls = self.polls.lock();
        let count = polls.entry(handle.0.clone()).or_insert(0);
        *count += 1;

        if let Some(reason) = self.failing.get(&handle.0) {
            return Ok(DeleteStatus::Failed {
                reason: reason.clone(),
            });
        }
        if self.stuck || *count <= self.pending_polls {
            return Ok(DeleteStatus::Pending);
        }
        Ok(DeleteStatus::Complete)
    }

    fn noun(&self) -> &'static str {
        "objects"
    }
}
