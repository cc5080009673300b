//! repodock core - repository provisioning for a code review server
//!
//! This crate holds the provisioning workflow: operators request clones and
//! deletions through the [`Dispatcher`], which enqueues jobs on a
//! [`JobQueue`]; workers driven by a [`WorkerRunner`] execute them against
//! the repository root and the [`Catalog`]; the [`ActivityReporter`] shows
//! what is queued, running and recorded in the operation logs.

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod git;
pub mod job;
pub mod name;
pub mod oplog;
pub mod queue;
pub mod reporter;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Catalog, CatalogEntry, IngestionState, MemoryCatalog, RepoHandles};
pub use config::{Config, ConfigOverrides};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result, ValidationError};
pub use job::{JobId, JobKind, ProvisioningJob, QueuedJob};
pub use name::{RepositoryName, RepositorySource};
pub use queue::{JobQueue, MemoryJobQueue};
pub use reporter::{ActivityOverview, ActivityReporter, CloningStatus, RepositorySummary};
pub use worker::{CloneWorker, DeleteWorker, JobOutcome, Worker, WorkerFailure, WorkerRunner};
