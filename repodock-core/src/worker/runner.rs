//! Worker runner
//!
//! Polls the job queue for each registered worker's kind and executes
//! claimed jobs with bounded parallelism. While a job runs its lease is
//! renewed every third of the lease timeout, so only jobs whose runner died
//! are handed out again. Every claimed job is completed once its worker
//! returns, whatever the outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{JobOutcome, Worker};
use crate::config::WorkerConfig;
use crate::job::{JobId, QueuedJob};
use crate::queue::JobQueue;
use crate::{Error, Result};

/// Claims jobs and hands them to workers
pub struct WorkerRunner {
    queue: Arc<dyn JobQueue>,
    workers: Vec<Arc<dyn Worker>>,
    config: WorkerConfig,
    worker_id: String,
    semaphore: Arc<Semaphore>,
}

impl WorkerRunner {
    pub fn new(queue: Arc<dyn JobQueue>, config: WorkerConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_jobs.max(1)));
        Self {
            queue,
            workers: Vec::new(),
            config,
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
            semaphore,
        }
    }

    /// Register a worker for its job kind
    pub fn with_worker(mut self, worker: Arc<dyn Worker>) -> Self {
        self.workers.push(worker);
        self
    }

    /// Identifier recorded on claimed jobs
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Poll until `shutdown` resolves
    ///
    /// Jobs already running when shutdown is requested are finished first.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let kinds: Vec<String> = self.workers.iter().map(|w| w.kind().to_string()).collect();
        info!(
            worker_id = %self.worker_id,
            queues = ?kinds,
            "Starting worker runner (interval: {:?})",
            self.config.poll_interval
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(worker_id = %self.worker_id, "Worker runner stopping");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }

            match self.run_once().await {
                Ok(executed) if executed > 0 => {
                    info!("Executed {} job(s) this cycle", executed)
                }
                Ok(_) => debug!("No jobs available"),
                Err(e) => error!("Error during poll cycle: {}", e),
            }
        }
    }

    /// Perform a single poll cycle, returning the number of jobs executed
    pub async fn run_once(&self) -> Result<usize> {
        let lease = chrono::Duration::from_std(self.config.lease_timeout)
            .map_err(|e| Error::Config(format!("Invalid lease timeout: {}", e)))?;

        let mut handles = Vec::new();

        for worker in &self.workers {
            let kind = worker.kind();

            let requeued = self
                .queue
                .requeue_abandoned(kind, Utc::now() - lease)
                .await?;
            if requeued > 0 {
                warn!(queue = kind.queue_name(), requeued, "Requeued abandoned jobs");
            }

            // Claim only as many jobs as there are free slots
            while let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
                let Some(job) = self.queue.claim(kind, &self.worker_id).await? else {
                    break;
                };
                handles.push(self.spawn_job_task(Arc::clone(worker), job, permit));
            }
        }

        let executed = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Job task panicked: {}", e);
            }
        }

        Ok(executed)
    }

    fn heartbeat_interval(&self) -> Duration {
        (self.config.lease_timeout / 3).max(Duration::from_millis(1))
    }

    fn spawn_job_task(
        &self,
        worker: Arc<dyn Worker>,
        job: QueuedJob,
        permit: OwnedSemaphorePermit,
    ) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let worker_id = self.worker_id.clone();
        let heartbeat_every = self.heartbeat_interval();

        tokio::spawn(async move {
            // Held until the job is completed
            let _permit = permit;

            let run = worker.run(&job);
            tokio::pin!(run);

            let mut heartbeat = tokio::time::interval(heartbeat_every);
            heartbeat.tick().await;

            let outcome = loop {
                tokio::select! {
                    outcome = &mut run => break outcome,
                    _ = heartbeat.tick() => renew_lease(queue.as_ref(), job.id, &worker_id).await,
                }
            };

            if let JobOutcome::Failed(failure) = &outcome {
                debug!(job_id = job.id, error = %failure, "Job failed, not retrying");
            }

            match queue.complete(job.id, &worker_id).await {
                Ok(true) => {}
                Ok(false) => warn!(job_id = job.id, "Lease was lost before the job finished"),
                Err(e) => error!(job_id = job.id, error = %e, "Failed to complete job"),
            }
        })
    }
}

async fn renew_lease(queue: &dyn JobQueue, id: JobId, worker_id: &str) {
    match queue.heartbeat(id, worker_id).await {
        Ok(true) => debug!(job_id = id, "Lease renewed"),
        Ok(false) => warn!(job_id = id, "Lease was handed to another worker"),
        Err(e) => warn!(job_id = id, error = %e, "Failed to renew lease"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, JobKind, ProvisioningJob};
    use crate::name::RepositoryName;
    use crate::queue::MemoryJobQueue;
    use crate::worker::WorkerFailure;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingWorker {
        kind: JobKind,
        fail: bool,
        seen: Mutex<Vec<JobId>>,
    }

    impl RecordingWorker {
        fn new(kind: JobKind, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fail,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<JobId> {
            let mut seen = self.seen.lock().unwrap().clone();
            seen.sort();
            seen
        }
    }

    #[async_trait]
    impl Worker for RecordingWorker {
        fn kind(&self) -> JobKind {
            self.kind
        }

        async fn run(&self, job: &QueuedJob) -> JobOutcome {
            self.seen.lock().unwrap().push(job.id);
            if self.fail {
                JobOutcome::Failed(WorkerFailure::Operation("boom".to_string()))
            } else {
                JobOutcome::Succeeded("ok".to_string())
            }
        }
    }

    /// Sleeps through each job and tracks how many run at once
    struct SlowWorker {
        delay: Duration,
        runs: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl SlowWorker {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                runs: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Worker for SlowWorker {
        fn kind(&self) -> JobKind {
            JobKind::Delete
        }

        async fn run(&self, _job: &QueuedJob) -> JobOutcome {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            JobOutcome::Succeeded("ok".to_string())
        }
    }

    /// Loses its claim to another worker while running
    struct PreemptedWorker {
        queue: Arc<MemoryJobQueue>,
    }

    #[async_trait]
    impl Worker for PreemptedWorker {
        fn kind(&self) -> JobKind {
            JobKind::Delete
        }

        async fn run(&self, _job: &QueuedJob) -> JobOutcome {
            let later = Utc::now() + chrono::Duration::seconds(1);
            self.queue.requeue_abandoned(JobKind::Delete, later).await.unwrap();
            self.queue.claim(JobKind::Delete, "worker-other").await.unwrap();
            JobOutcome::Succeeded("ok".to_string())
        }
    }

    fn config(max_parallel_jobs: usize) -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_millis(10),
            lease_timeout: Duration::from_secs(60),
            max_parallel_jobs,
        }
    }

    fn delete_job(name: &str) -> ProvisioningJob {
        ProvisioningJob::Delete {
            name: RepositoryName::new(name).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_run_once_respects_parallelism() {
        let queue = Arc::new(MemoryJobQueue::new());
        for name in ["a", "b", "c"] {
            queue.enqueue(delete_job(name)).await.unwrap();
        }

        let worker = RecordingWorker::new(JobKind::Delete, false);
        let runner = WorkerRunner::new(queue.clone(), config(2)).with_worker(worker.clone());

        assert_eq!(runner.run_once().await.unwrap(), 2);
        assert_eq!(worker.seen(), vec![1, 2]);
        assert_eq!(queue.len().unwrap(), 1);

        assert_eq!(runner.run_once().await.unwrap(), 1);
        assert_eq!(worker.seen(), vec![1, 2, 3]);
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_failed_jobs_are_completed() {
        let queue = Arc::new(MemoryJobQueue::new());
        queue.enqueue(delete_job("a")).await.unwrap();

        let worker = RecordingWorker::new(JobKind::Delete, true);
        let runner = WorkerRunner::new(queue.clone(), config(1)).with_worker(worker.clone());

        assert_eq!(runner.run_once().await.unwrap(), 1);
        assert!(queue.is_empty().unwrap());
        assert_eq!(runner.run_once().await.unwrap(), 0);
        assert_eq!(worker.seen(), vec![1]);
    }

    #[tokio::test]
    async fn test_abandoned_jobs_are_redelivered() {
        let queue = Arc::new(MemoryJobQueue::new());
        queue.enqueue(delete_job("a")).await.unwrap();
        // a worker that claimed the job and died
        queue.claim(JobKind::Delete, "dead-worker").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let worker = RecordingWorker::new(JobKind::Delete, false);
        let mut cfg = config(1);
        cfg.lease_timeout = Duration::from_millis(5);
        let runner = WorkerRunner::new(queue.clone(), cfg).with_worker(worker.clone());

        assert_eq!(runner.run_once().await.unwrap(), 1);
        assert_eq!(worker.seen(), vec![1]);
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_parallel_jobs_never_exceed_limit() {
        let queue = Arc::new(MemoryJobQueue::new());
        for name in ["a", "b", "c", "d", "e"] {
            queue.enqueue(delete_job(name)).await.unwrap();
        }

        let worker = SlowWorker::new(Duration::from_millis(20));
        let runner = WorkerRunner::new(queue.clone(), config(2)).with_worker(worker.clone());

        let mut executed = 0;
        while !queue.is_empty().unwrap() {
            executed += runner.run_once().await.unwrap();
        }

        assert_eq!(executed, 5);
        assert_eq!(worker.runs.load(Ordering::SeqCst), 5);
        assert_eq!(worker.max_running.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_running_job_keeps_its_lease() {
        let queue = Arc::new(MemoryJobQueue::new());
        queue.enqueue(delete_job("a")).await.unwrap();

        let mut cfg = config(1);
        cfg.lease_timeout = Duration::from_millis(60);
        let worker = SlowWorker::new(Duration::from_millis(300));
        let first = WorkerRunner::new(queue.clone(), cfg.clone()).with_worker(worker.clone());
        let second = WorkerRunner::new(queue.clone(), cfg).with_worker(worker.clone());

        let watch = async {
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_millis(40)).await;
                assert_eq!(second.run_once().await.unwrap(), 0);
                let running = queue.in_progress(JobKind::Delete).await.unwrap();
                assert_eq!(running.len(), 1);
                assert!(running[0].is_owned_by(first.worker_id()));
            }
        };
        let (executed, ()) = tokio::join!(first.run_once(), watch);

        assert_eq!(executed.unwrap(), 1);
        assert_eq!(worker.runs.load(Ordering::SeqCst), 1);
        assert_eq!(worker.max_running.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_preempted_runner_leaves_job_to_new_owner() {
        let queue = Arc::new(MemoryJobQueue::new());
        queue.enqueue(delete_job("a")).await.unwrap();

        let worker = Arc::new(PreemptedWorker {
            queue: queue.clone(),
        });
        let runner = WorkerRunner::new(queue.clone(), config(1)).with_worker(worker);

        assert_eq!(runner.run_once().await.unwrap(), 1);

        let running = queue.in_progress(JobKind::Delete).await.unwrap();
        assert_eq!(running.len(), 1);
        assert!(running[0].is_owned_by("worker-other"));
    }

    #[tokio::test]
    async fn test_only_registered_kinds_are_claimed() {
        let queue = Arc::new(MemoryJobQueue::new());
        queue.enqueue(delete_job("a")).await.unwrap();

        let worker = RecordingWorker::new(JobKind::Clone, false);
        let runner = WorkerRunner::new(queue.clone(), config(2)).with_worker(worker.clone());

        assert_eq!(runner.run_once().await.unwrap(), 0);
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let queue = Arc::new(MemoryJobQueue::new());
        queue.enqueue(delete_job("a")).await.unwrap();

        let worker = RecordingWorker::new(JobKind::Delete, false);
        let runner = WorkerRunner::new(queue.clone(), config(1)).with_worker(worker.clone());

        runner
            .run(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert_eq!(worker.seen(), vec![1]);
        assert!(queue.is_empty().unwrap());
    }
}
