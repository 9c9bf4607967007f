use std::path::{Path, PathBuf};

/// History store configuration.
///
/// The directory is resolved by the caller; [`StoreConfig::DEFAULT_DIR`] is
/// the relative `history` directory used when nothing else is configured.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one JSON file per history record.
    pub dir: PathBuf,
}

impl StoreConfig {
    /// The directory used when nothing else is configured.
    pub const DEFAULT_DIR: &str = "history";

    /// Build a config from an explicit directory (useful for tests and CLI flags).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
