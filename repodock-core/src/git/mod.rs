//! Git operations for repodock
//!
//! This module provides cloning, removal, and read access to repositories
//! under the repository root.

mod clone;
mod repo;

pub use clone::{clone_repo, remove_repo};
pub use repo::{CommitSummary, GitRepo};
