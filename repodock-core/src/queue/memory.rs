//! In-memory job queue
//!
//! Jobs live only as long as the process, so this queue is suitable for
//! tests and for running the server and workers inside one process.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::JobQueue;
use crate::job::{JobId, JobKind, ProvisioningJob, QueuedJob};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct QueueState {
    next_id: JobId,
    /// Pending and running jobs, ordered by id
    jobs: Vec<QueuedJob>,
}

/// In-memory implementation of [`JobQueue`]
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    state: Mutex<QueueState>,
}

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::Storage("job queue lock poisoned".to_string())
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of pending and running jobs across all queues
    pub fn len(&self) -> Result<usize> {
        Ok(self.state.lock().map_err(poison_err)?.jobs.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: ProvisioningJob) -> Result<QueuedJob> {
        let mut state = self.state.lock().map_err(poison_err)?;
        state.next_id += 1;

        let queued = QueuedJob {
            id: state.next_id,
            job,
            enqueued_at: Utc::now(),
            claimed_at: None,
            claimed_by: None,
        };
        state.jobs.push(queued.clone());

        Ok(queued)
    }

    async fn peek(&self, kind: JobKind, offset: usize, limit: usize) -> Result<Vec<QueuedJob>> {
        let state = self.state.lock().map_err(poison_err)?;

        Ok(state
            .jobs
            .iter()
            .filter(|q| q.job.kind() == kind && !q.is_claimed())
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn claim(&self, kind: JobKind, worker_id: &str) -> Result<Option<QueuedJob>> {
        let mut state = self.state.lock().map_err(poison_err)?;

        let next = state
            .jobs
            .iter_mut()
            .find(|q| q.job.kind() == kind && !q.is_claimed());

        Ok(next.map(|q| {
            q.claimed_at = Some(Utc::now());
            q.claimed_by = Some(worker_id.to_string());
            q.clone()
        }))
    }

    async fn in_progress(&self, kind: JobKind) -> Result<Vec<QueuedJob>> {
        let state = self.state.lock().map_err(poison_err)?;

        Ok(state
            .jobs
            .iter()
            .filter(|q| q.job.kind() == kind && q.is_claimed())
            .cloned()
            .collect())
    }

    async fn heartbeat(&self, id: JobId, worker_id: &str) -> Result<bool> {
        let mut state = self.state.lock().map_err(poison_err)?;

        match state.jobs.iter_mut().find(|q| q.id == id && q.is_owned_by(worker_id)) {
            Some(q) => {
                q.claimed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete(&self, id: JobId, worker_id: &str) -> Result<bool> {
        let mut state = self.state.lock().map_err(poison_err)?;
        let before = state.jobs.len();
        state.jobs.retain(|q| !(q.id == id && q.is_owned_by(worker_id)));
        Ok(state.jobs.len() < before)
    }

    async fn requeue_abandoned(
        &self,
        kind: JobKind,
        claimed_before: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = self.state.lock().map_err(poison_err)?;
        let mut requeued = 0;

        for q in state.jobs.iter_mut().filter(|q| q.job.kind() == kind) {
            if q.claimed_at.is_some_and(|at| at < claimed_before) {
                q.claimed_at = None;
                q.claimed_by = None;
                requeued += 1;
            }
        }

        Ok(requeued)
    }
}
