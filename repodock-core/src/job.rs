//! Provisioning jobs and the queues that carry them

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::name::{RepositoryName, RepositorySource};
use crate::{Error, Result};

/// Kind of provisioning work; each kind has its own queue and log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Clone,
    Delete,
}

impl JobKind {
    /// All kinds, in the order workers service them
    pub const ALL: [JobKind; 2] = [JobKind::Clone, JobKind::Delete];

    /// Name of the queue holding jobs of this kind
    pub fn queue_name(&self) -> &'static str {
        match self {
            JobKind::Clone => "clone_new_repo",
            JobKind::Delete => "delete_repo",
        }
    }

    /// File name of the operation log written by this kind's worker
    pub fn log_file(&self) -> &'static str {
        match self {
            JobKind::Clone => "clone_new_repo.log",
            JobKind::Delete => "delete_repo.log",
        }
    }

    /// Resolve a kind from its queue name
    pub fn from_queue_name(queue: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.queue_name() == queue)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Clone => f.write_str("clone"),
            JobKind::Delete => f.write_str("delete"),
        }
    }
}

impl FromStr for JobKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clone" => Ok(JobKind::Clone),
            "delete" => Ok(JobKind::Delete),
            other => Self::from_queue_name(other)
                .ok_or_else(|| Error::Other(format!("Unknown job kind: {}", other))),
        }
    }
}

/// A unit of provisioning work, immutable once enqueued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProvisioningJob {
    /// Clone `source` into `REPOS_ROOT/name`
    Clone {
        name: RepositoryName,
        source: RepositorySource,
    },
    /// Remove `REPOS_ROOT/name` and its catalog entry
    Delete { name: RepositoryName },
}

impl ProvisioningJob {
    pub fn kind(&self) -> JobKind {
        match self {
            ProvisioningJob::Clone { .. } => JobKind::Clone,
            ProvisioningJob::Delete { .. } => JobKind::Delete,
        }
    }

    /// Target repository of the job
    pub fn name(&self) -> &RepositoryName {
        match self {
            ProvisioningJob::Clone { name, .. } | ProvisioningJob::Delete { name } => name,
        }
    }

    /// Serialize the job arguments for a queue backend
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a job from a queue backend payload
    pub fn from_payload(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Queue-assigned job identifier; increases in enqueue order
pub type JobId = i64;

/// A job as held by a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: JobId,
    pub job: ProvisioningJob,
    pub enqueued_at: DateTime<Utc>,
    /// Set once a worker has claimed the job, renewed by its heartbeats
    pub claimed_at: Option<DateTime<Utc>>,
    /// Worker holding the current claim
    pub claimed_by: Option<String>,
}

impl QueuedJob {
    pub fn is_claimed(&self) -> bool {
        self.claimed_at.is_some()
    }

    /// Whether `worker_id` holds the current claim
    pub fn is_owned_by(&self, worker_id: &str) -> bool {
        self.claimed_by.as_deref() == Some(worker_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clone_job() -> ProvisioningJob {
        ProvisioningJob::Clone {
            name: RepositoryName::new("foo").unwrap(),
            source: RepositorySource::parse("https://example.com/foo.git").unwrap(),
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = clone_job().to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["kind"], "clone");
        assert_eq!(value["name"], "foo");
        assert_eq!(value["source"], "https://example.com/foo.git");
    }

    #[test]
    fn test_payload_rejects_bad_name() {
        let payload = r#"{"kind":"delete","name":"../../etc"}"#;
        assert!(ProvisioningJob::from_payload(payload).is_err());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(clone_job().kind(), JobKind::Clone);
        assert_eq!(JobKind::Clone.queue_name(), "clone_new_repo");
        assert_eq!(JobKind::Delete.log_file(), "delete_repo.log");
        assert_eq!(
            JobKind::from_queue_name("delete_repo"),
            Some(JobKind::Delete)
        );
        assert_eq!("clone".parse::<JobKind>().unwrap(), JobKind::Clone);
        assert_eq!("delete_repo".parse::<JobKind>().unwrap(), JobKind::Delete);
        assert!("fetch".parse::<JobKind>().is_err());
    }
}
