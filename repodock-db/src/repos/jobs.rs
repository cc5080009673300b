//! SQLite job queue

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use repodock_core::job::{JobId, JobKind, ProvisioningJob, QueuedJob};
use repodock_core::queue::JobQueue;

use crate::Error;

const JOB_COLUMNS: &str = "id, payload, enqueued_at, claimed_at, worker_id";

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: i64,
    payload: String,
    enqueued_at: DateTime<Utc>,
    claimed_at: Option<DateTime<Utc>>,
    worker_id: Option<String>,
}

impl JobRow {
    fn into_queued(self) -> repodock_core::Result<QueuedJob> {
        Ok(QueuedJob {
            id: self.id,
            job: ProvisioningJob::from_payload(&self.payload)?,
            enqueued_at: self.enqueued_at,
            claimed_at: self.claimed_at,
            claimed_by: self.worker_id,
        })
    }
}

fn into_queued(rows: Vec<JobRow>) -> repodock_core::Result<Vec<QueuedJob>> {
    rows.into_iter().map(JobRow::into_queued).collect()
}

/// [`JobQueue`] stored in the `jobs` table
///
/// Pending rows have status `queued`; a claim flips the oldest one to
/// `running` in a single statement, so concurrent workers never claim the
/// same job. Heartbeats and completion match on `worker_id`, so a worker
/// whose lease was handed to another cannot touch the job any more.
/// Completed jobs are deleted.
#[derive(Debug, Clone)]
pub struct SqliteJobQueue {
    pool: SqlitePool,
}

impl SqliteJobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, job: ProvisioningJob) -> repodock_core::Result<QueuedJob> {
        let payload = job.to_payload()?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO jobs (queue, payload, status, enqueued_at) VALUES (?, ?, 'queued', ?)",
        )
        .bind(job.kind().queue_name())
        .bind(&payload)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::from)?;

        Ok(QueuedJob {
            id: result.last_insert_rowid(),
            job,
            enqueued_at: now,
            claimed_at: None,
            claimed_by: None,
        })
    }

    async fn peek(
        &self,
        kind: JobKind,
        offset: usize,
        limit: usize,
    ) -> repodock_core::Result<Vec<QueuedJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs WHERE queue = ? AND status = 'queued' ORDER BY id LIMIT ? OFFSET ?",
            JOB_COLUMNS
        ))
        .bind(kind.queue_name())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from)?;

        into_queued(rows)
    }

    async fn claim(
        &self,
        kind: JobKind,
        worker_id: &str,
    ) -> repodock_core::Result<Option<QueuedJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs SET status = 'running', claimed_at = ?, worker_id = ?
            WHERE id = (
                SELECT id FROM jobs WHERE queue = ? AND status = 'queued' ORDER BY id LIMIT 1
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(Utc::now())
        .bind(worker_id)
        .bind(kind.queue_name())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        tracing::debug!(job_id = row.id, queue = kind.queue_name(), worker_id, "Claimed job");
        row.into_queued().map(Some)
    }

    async fn in_progress(&self, kind: JobKind) -> repodock_core::Result<Vec<QueuedJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs WHERE queue = ? AND status = 'running' ORDER BY id",
            JOB_COLUMNS
        ))
        .bind(kind.queue_name())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from)?;

        into_queued(rows)
    }

    async fn heartbeat(&self, id: JobId, worker_id: &str) -> repodock_core::Result<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET claimed_at = ? WHERE id = ? AND status = 'running' AND worker_id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(Error::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete(&self, id: JobId, worker_id: &str) -> repodock_core::Result<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ? AND worker_id = ?")
            .bind(id)
            .bind(worker_id)
            .execute(&self.pool)
            .await
            .map_err(Error::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn requeue_abandoned(
        &self,
        kind: JobKind,
        claimed_before: DateTime<Utc>,
    ) -> repodock_core::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = 'queued', claimed_at = NULL, worker_id = NULL
            WHERE queue = ? AND status = 'running' AND julianday(claimed_at) < julianday(?)
            "#,
        )
        .bind(kind.queue_name())
        .bind(claimed_before)
        .execute(&self.pool)
        .await
        .map_err(Error::from)?;

        Ok(result.rows_affected())
    }
}
