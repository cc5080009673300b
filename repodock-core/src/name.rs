//! Repository names and clone sources

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Name of a provisioned repository
///
/// A name is a single directory component under the repository root, so it
/// may not contain separators or be `..`, and may not start with `.` (dot
/// directories under the root are reserved for staging).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validate and wrap a repository name
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(ValidationError::InvalidInput(
                "'name' is required.".to_string(),
            ));
        }

        if name == ".." || name.contains('/') || name.contains('\\') {
            return Err(ValidationError::PathTraversal(name));
        }

        if name.starts_with('.') || name.contains('\0') {
            return Err(ValidationError::InvalidInput(format!(
                "\"{}\" is not a valid repository name.",
                name.escape_default()
            )));
        }

        Ok(Self(name))
    }

    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of this repository under the given root
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepositoryName> for String {
    fn from(name: RepositoryName) -> Self {
        name.0
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Remote origin a repository is cloned from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositorySource(url::Url);

impl RepositorySource {
    /// Parse an operator-supplied clone URL
    ///
    /// Supports any absolute URI the url crate accepts, plus the scp-like
    /// form git uses for ssh remotes:
    /// - `https://github.com/owner/repo.git`
    /// - `ssh://git@github.com/owner/repo.git`
    /// - `git@github.com:owner/repo.git` (stored as `ssh://git@github.com/owner/repo.git`)
    /// - `file:///srv/mirrors/repo.git`
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(ValidationError::InvalidInput(
                "'url' is required.".to_string(),
            ));
        }

        let normalized = scp_to_ssh(input);
        url::Url::parse(normalized.as_deref().unwrap_or(input))
            .map(Self)
            .map_err(|_| ValidationError::InvalidInput("This is not a valid URL.".to_string()))
    }

    /// Derive the repository name from the final path segment
    ///
    /// The last extension is stripped, so `https://example.com/foo.git`
    /// becomes `foo` and `https://example.com/foo.bar.git` becomes `foo.bar`.
    pub fn derive_name(&self) -> Result<RepositoryName, ValidationError> {
        let segment = self
            .0
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .ok_or_else(|| {
                ValidationError::InvalidInput(format!(
                    "Cannot derive a repository name from {}.",
                    self.0
                ))
            })?;

        let stem = match segment.rfind('.') {
            Some(idx) if idx > 0 => &segment[..idx],
            _ => segment,
        };

        RepositoryName::new(stem)
    }

    /// The URL as passed to git
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Rewrite `user@host:path` as `ssh://user@host/path`
///
/// Inputs with a scheme, or without a user part, are left alone.
fn scp_to_ssh(input: &str) -> Option<String> {
    if input.contains("://") {
        return None;
    }

    let (user_host, path) = input.split_once(':')?;
    let (user, host) = user_host.split_once('@')?;
    if user.is_empty() || host.is_empty() || host.contains('/') || path.is_empty() {
        return None;
    }

    Some(format!(
        "ssh://{}@{}/{}",
        user,
        host,
        path.trim_start_matches('/')
    ))
}

impl fmt::Display for RepositorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl TryFrom<String> for RepositorySource {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepositorySource> for String {
    fn from(source: RepositorySource) -> Self {
        source.0.into()
    }
}
