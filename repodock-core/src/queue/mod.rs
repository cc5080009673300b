//! Job queue abstraction
//!
//! This module provides:
//!
//! - [`JobQueue`]: Trait for durable, at-least-once provisioning queues
//! - [`MemoryJobQueue`]: In-memory queue for tests and single-process use
//!
//! Each [`JobKind`] maps to its own named queue. Jobs move from *pending*
//! to *running* when a worker claims them and disappear when the worker
//! completes them. A claim is a lease: its owner renews it with
//! [`JobQueue::heartbeat`] while the job runs. Running jobs whose lease went
//! stale are put back with [`JobQueue::requeue_abandoned`], so a job may be
//! delivered more than once. Only the current owner of a claim can renew or
//! complete it.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::job::{JobId, JobKind, ProvisioningJob, QueuedJob};
use crate::Result;

pub use memory::MemoryJobQueue;

/// Durable work queue shared by the dispatcher, workers and reporter
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job to the queue for its kind
    async fn enqueue(&self, job: ProvisioningJob) -> Result<QueuedJob>;

    /// Inspect pending jobs in FIFO order without removing them
    async fn peek(&self, kind: JobKind, offset: usize, limit: usize) -> Result<Vec<QueuedJob>>;

    /// Take the oldest pending job and mark it as running
    async fn claim(&self, kind: JobKind, worker_id: &str) -> Result<Option<QueuedJob>>;

    /// Jobs currently claimed by a worker, oldest first
    async fn in_progress(&self, kind: JobKind) -> Result<Vec<QueuedJob>>;

    /// Renew the lease on a running job
    ///
    /// Returns `false` when `worker_id` no longer owns the claim.
    async fn heartbeat(&self, id: JobId, worker_id: &str) -> Result<bool>;

    /// Remove a finished job
    ///
    /// Returns `false`, leaving the job in place, when `worker_id` no longer
    /// owns the claim.
    async fn complete(&self, id: JobId, worker_id: &str) -> Result<bool>;

    /// Return running jobs whose lease was last renewed before
    /// `claimed_before` to the pending state
    async fn requeue_abandoned(&self, kind: JobKind, claimed_before: DateTime<Utc>)
        -> Result<u64>;
}
