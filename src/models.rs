use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-source outcome of a copy request.
///
/// Copy problems never abort ingestion; they are logged and recorded here so
/// callers (and tests) can see what happened to each requested source.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Sources that were copied into the archive tree
    pub copied: Vec<PathBuf>,
    /// Sources that existed but could not be copied
    pub failed: Vec<PathBuf>,
    /// Sources that were absent or of the wrong type
    pub skipped: Vec<PathBuf>,
}

impl CopyReport {
    /// True when nothing was copied and nothing failed, i.e. the request
    /// matched no usable source at all.
    pub fn not_found(&self) -> bool {
        self.copied.is_empty() && self.failed.is_empty()
    }

    pub fn merge(&mut self, other: CopyReport) {
        self.copied.extend(other.copied);
        self.failed.extend(other.failed);
        self.skipped.extend(other.skipped);
    }
}

/// The compressed archive produced by `ArchiveBuilder::package`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackagedArchive {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: Option<String>,
}
