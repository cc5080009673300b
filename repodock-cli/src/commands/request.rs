//! Clone and delete commands - schedule provisioning jobs

use clap::Args;
use repodock_core::{Config, Dispatcher, QueuedJob};

use super::Backends;

/// Target of a clone (URL) or delete (repository name) request
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Repository URL for `clone`, repository name for `delete`
    target: String,
}

impl RequestArgs {
    pub async fn execute_clone(&self, config: &Config) -> anyhow::Result<()> {
        let dispatcher = dispatcher(config).await?;
        let queued = dispatcher.request_clone(&self.target).await?;
        print_queued("clone", &queued);
        Ok(())
    }

    pub async fn execute_delete(&self, config: &Config) -> anyhow::Result<()> {
        let dispatcher = dispatcher(config).await?;
        let queued = dispatcher.request_delete(&self.target).await?;
        print_queued("delete", &queued);
        Ok(())
    }
}

async fn dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let backends = Backends::open(config).await?;
    Ok(Dispatcher::new(backends.queue, &config.storage.repos_root))
}

fn print_queued(action: &str, queued: &QueuedJob) {
    println!(
        "Queued {} of {} (job {})",
        action,
        queued.job.name(),
        queued.id
    );
}
