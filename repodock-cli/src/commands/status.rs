//! Read-only commands - status, log and repos

use clap::Args;
use repodock_core::oplog::MAX_TAIL_LINES;
use repodock_core::{Config, JobKind, JobQueue};

use super::Backends;

/// Show pending and running provisioning jobs
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl StatusArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let backends = Backends::open(config).await?;
        let reporter = backends.reporter(config);
        let cloning = reporter.cloning_status().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&cloning)?);
            return Ok(());
        }

        println!();
        print_names("Being cloned", &cloning.pending);
        print_names("Cloning now", &cloning.in_progress);

        let deletes = backends
            .queue
            .peek(JobKind::Delete, 0, config.reporter.peek_limit)
            .await?;
        let deletes: Vec<_> = deletes.iter().map(|q| q.job.name().clone()).collect();
        print_names("Waiting for deletion", &deletes);

        Ok(())
    }
}

fn print_names<T: std::fmt::Display>(title: &str, names: &[T]) {
    if names.is_empty() {
        println!("{}: none", title);
    } else {
        println!("{}:", title);
        for name in names {
            println!("  {}", name);
        }
    }
    println!();
}

/// Print the tail of an operation log
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Log file name, e.g. clone_new_repo.log
    file: String,

    /// Number of lines to show
    #[arg(short = 'n', long, default_value_t = 20)]
    lines: usize,
}

impl LogArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if self.lines > MAX_TAIL_LINES {
            tracing::warn!("Showing at most {} lines", MAX_TAIL_LINES);
        }

        let backends = Backends::open(config).await?;
        for line in backends.reporter(config).tail_log(&self.file, self.lines)? {
            println!("{}", line);
        }

        Ok(())
    }
}

/// List catalogued repositories
#[derive(Args, Debug)]
pub struct ReposArgs {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl ReposArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let backends = Backends::open(config).await?;
        let overview = backends.reporter(config).overview().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&overview)?);
            return Ok(());
        }

        if overview.repositories.is_empty() {
            println!("No repositories.");
            return Ok(());
        }

        for repo in &overview.repositories {
            let latest = repo
                .latest_commit
                .as_ref()
                .map(|c| format!("{} {}", &c.sha[..c.sha.len().min(10)], c.summary))
                .unwrap_or_else(|| "(no commits)".to_string());
            println!("{:<30} [{}] {}", repo.name, repo.state.as_str(), latest);
        }

        Ok(())
    }
}
