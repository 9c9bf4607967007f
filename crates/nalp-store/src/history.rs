//! The history store: save, list, read and delete plan records.
//!
//! Each record lives in `<dir>/<id>.json`. There is no locking; concurrent
//! saves to the same id race at the filesystem level and the last writer
//! wins.

use std::cmp::Reverse;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::models::{HistoryRecord, InvalidRecordId, RecordId};

/// Errors from history store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidRecordId),

    #[error("history record {0} not found")]
    NotFound(String),

    #[error("history I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history record {id} JSON error: {source}")]
    Json {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed store of [`HistoryRecord`]s.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            dir: config.dir.clone(),
        }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })
    }

    /// Write a record, overwriting any existing record with the same id.
    ///
    /// The store directory is created on first use.
    pub async fn save(&self, record: &HistoryRecord) -> Result<RecordId, StoreError> {
        let id: RecordId = record.id.parse()?;
        self.ensure_dir().await?;

        let body = serde_json::to_string_pretty(record).map_err(|source| StoreError::Json {
            id: record.id.clone(),
            source,
        })?;
        let path = self.record_path(&id);
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        info!(%id, path = %path.display(), "saved history record");
        Ok(id)
    }

    /// List every readable record, newest first.
    ///
    /// Files that cannot be read or parsed are skipped. A missing directory
    /// is an empty history.
    pub async fn list(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut records = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(StoreError::Io {
                        path: self.dir.clone(),
                        source,
                    });
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable history file");
                    continue;
                }
            };
            match serde_json::from_str::<HistoryRecord>(&contents) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping corrupt history file");
                }
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Read a single record by id.
    pub async fn get(&self, id: &str) -> Result<HistoryRecord, StoreError> {
        let id: RecordId = id.parse()?;
        let path = self.record_path(&id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&contents).map_err(|source| StoreError::Json {
            id: id.to_string(),
            source,
        })
    }

    /// Delete a record by id. Deleting an unknown id is [`StoreError::NotFound`].
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id: RecordId = id.parse()?;
        let path = self.record_path(&id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(%id, "deleted history record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id.to_string())),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

/// Newest first; ties fall back to reverse timestamp string order.
fn sort_newest_first(records: &mut [HistoryRecord]) {
    records.sort_by_key(|r| Reverse((r.timestamp_key(), r.timestamp.clone())));
}
