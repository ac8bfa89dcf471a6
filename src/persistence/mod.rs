//! Durable storage for extracted log records and pipeline progress.

pub mod error;
pub mod sqlite;
pub use sqlite::SqliteRecordStore;
pub mod traits;
