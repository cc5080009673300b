//! Repository modules for database operations

pub mod catalog;
pub mod jobs;

pub use catalog::SqliteCatalog;
pub use jobs::SqliteJobQueue;
