//! repodock CLI - repository provisioning service
//!
//! Runs the admin HTTP API and the provisioning workers, and offers the same
//! operations from the command line.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use repodock_core::{Config, ConfigOverrides};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{LogArgs, ReposArgs, RequestArgs, ServeArgs, StatusArgs, WorkerArgs};

/// repodock: clone, track and remove repositories for a code review server
#[derive(Parser, Debug)]
#[command(name = "repodock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/repodock/config.toml)
    #[arg(long, global = true, env = "REPODOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the repositories (overrides config and env)
    #[arg(long, global = true)]
    repos_root: Option<PathBuf>,

    /// Directory holding the operation logs (overrides config and env)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// SQLite database file (overrides config and env)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Run the admin HTTP API
    Serve(ServeArgs),

    /// Run provisioning workers
    #[command(visible_alias = "w")]
    Worker(WorkerArgs),

    /// Schedule a clone of a repository URL
    #[command(name = "clone")]
    CloneRepo(RequestArgs),

    /// Schedule deletion of a repository by name
    #[command(name = "delete")]
    DeleteRepo(RequestArgs),

    /// Show pending and running provisioning jobs
    Status(StatusArgs),

    /// Print the tail of an operation log
    Log(LogArgs),

    /// List catalogued repositories
    Repos(ReposArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "repodock=debug,tower_http=debug"
    } else {
        "repodock=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();

    // Load configuration with overrides
    let overrides = ConfigOverrides {
        repos_root: cli.repos_root.clone(),
        log_dir: cli.log_dir.clone(),
        database_path: cli.database.clone(),
        bind_addr: None,
    };
    let config = Config::load_with_overrides(cli.config.as_deref(), overrides)?;
    config.validate()?;

    tracing::debug!(
        repos_root = %config.storage.repos_root.display(),
        log_dir = %config.storage.log_dir.display(),
        database = %config.storage.database_path.display(),
        "Configuration loaded"
    );

    match cli.command {
        Some(Commands::Version) => {
            println!("repodock {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Worker(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::CloneRepo(args)) => {
            args.execute_clone(&config).await?;
        }
        Some(Commands::DeleteRepo(args)) => {
            args.execute_delete(&config).await?;
        }
        Some(Commands::Status(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Log(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Repos(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Config) => {
            println!("# repodock configuration");
            match cli.config.clone().or_else(Config::default_config_path) {
                Some(path) if path.exists() => println!("# file: {}", path.display()),
                Some(path) => println!("# file: {} (not found - using defaults)", path.display()),
                None => println!("# file: (none)"),
            }
            println!();
            print!("{}", config.to_toml()?);
        }
        None => {
            println!("repodock - repository provisioning for code review");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_worker_queue() {
        let cli = Cli::parse_from(["repodock", "worker", "--queue", "clone", "--once"]);
        assert!(matches!(cli.command, Some(Commands::Worker(_))));
    }

    #[test]
    fn test_parse_global_overrides() {
        let cli = Cli::parse_from([
            "repodock",
            "log",
            "clone_new_repo.log",
            "-n",
            "50",
            "--repos-root",
            "/srv/repos",
        ]);
        assert_eq!(cli.repos_root, Some(PathBuf::from("/srv/repos")));
        assert!(matches!(cli.command, Some(Commands::Log(_))));
    }

    #[test]
    fn test_parse_clone() {
        let cli = Cli::parse_from(["repodock", "clone", "https://example.com/foo.git"]);
        assert!(matches!(cli.command, Some(Commands::CloneRepo(_))));
    }
}
