//! File-backed persistence for generated build plans.
//!
//! One JSON file per [`HistoryRecord`], named after its validated
//! [`RecordId`], inside a single history directory.

pub mod config;
pub mod history;
pub mod models;

pub use config::StoreConfig;
pub use history::{HistoryStore, StoreError};
pub use models::{HistoryRecord, InvalidRecordId, RecordId, TimestampKey};
