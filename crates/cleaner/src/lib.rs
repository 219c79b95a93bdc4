// Core library of the Synapse cleaner

pub mod backend;
pub mod config;
pub mod diff;
pub mod display;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod media;
pub mod purge;
pub mod render;
pub mod synapse;
pub mod width;

// Re-export commonly used types
pub use backend::{delete_until_terminal, DeleteHandle, DeleteStatus, RemoteBackend};
pub use config::CleanerConfig;
pub use diff::{diff, diff_by_key};
pub use error::{CleanerError, ExecutorError, RenderError};
pub use executor::BatchExecutor;
pub use jobs::{BatchSnapshot, JobState, WorkItem};
pub use purge::{PurgeOutcome, PurgeReport, Purger, Screen};
pub use render::{CrosstermSink, RecordingSink, Renderer, TermOp, TermSink};
