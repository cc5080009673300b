//! Worker command - run provisioning workers

use std::sync::Arc;

use clap::{Args, ValueEnum};
use repodock_core::{CloneWorker, Config, DeleteWorker, JobKind, WorkerRunner};

use super::{shutdown_signal, Backends};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueSelection {
    Clone,
    Delete,
    All,
}

impl QueueSelection {
    fn kinds(self) -> &'static [JobKind] {
        match self {
            QueueSelection::Clone => &[JobKind::Clone],
            QueueSelection::Delete => &[JobKind::Delete],
            QueueSelection::All => &JobKind::ALL,
        }
    }
}

/// Run provisioning workers until interrupted
#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Queue(s) to service
    #[arg(long, value_enum, default_value = "all")]
    queue: QueueSelection,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,
}

impl WorkerArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let backends = Backends::open(config).await?;
        let storage = &config.storage;

        let mut runner = WorkerRunner::new(backends.queue.clone(), config.worker.clone());
        for kind in self.queue.kinds() {
            runner = match kind {
                JobKind::Clone => runner.with_worker(Arc::new(CloneWorker::new(
                    &storage.repos_root,
                    backends.catalog.clone(),
                    &storage.log_dir,
                )?)),
                JobKind::Delete => runner.with_worker(Arc::new(DeleteWorker::new(
                    &storage.repos_root,
                    backends.catalog.clone(),
                    &storage.log_dir,
                )?)),
            };
        }

        if self.once {
            let executed = runner.run_once().await?;
            println!("Executed {} job(s)", executed);
            return Ok(());
        }

        runner.run(shutdown_signal()).await?;
        Ok(())
    }
}
