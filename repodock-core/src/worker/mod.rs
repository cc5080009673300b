//! Provisioning workers
//!
//! A worker executes one claimed job at a time and reports the outcome in
//! its operation log. Failures never propagate to the requester: the job is
//! completed either way and there is no automatic retry.
//!
//! Jobs are delivered at least once, so every worker must tolerate seeing
//! the same job twice.

pub mod clone;
pub mod delete;
pub mod runner;

use async_trait::async_trait;
use thiserror::Error;

use crate::job::{JobId, JobKind, QueuedJob};

pub use clone::CloneWorker;
pub use delete::DeleteWorker;
pub use runner::WorkerRunner;

/// Why a job did not reach its goal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    /// The target path is taken by something this job did not create
    #[error("{0}")]
    Conflict(String),

    /// The git or filesystem operation failed
    #[error("{0}")]
    Operation(String),

    /// The job was routed to a worker of another kind
    #[error("job {id} is a {kind} job")]
    WrongKind { id: JobId, kind: JobKind },
}

/// Result of executing a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded(String),
    Failed(WorkerFailure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded(_))
    }
}

/// Executes jobs of a single kind
#[async_trait]
pub trait Worker: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Execute a claimed job; the caller completes it afterwards
    async fn run(&self, job: &QueuedJob) -> JobOutcome;
}
