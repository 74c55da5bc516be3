use anyhow::{Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::models::CopyReport;

/// Running totals kept by the binary while it drives a builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub files_copied: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub artifacts_written: usize,
    pub artifacts_without_output: usize,
}

impl CollectionStats {
    pub fn record_copy(&mut self, report: &CopyReport) {
        self.files_copied += report.copied.len();
        self.files_failed += report.failed.len();
        self.files_skipped += report.skipped.len();
    }

    pub fn record_artifact(&mut self, written: bool) {
        if written {
            self.artifacts_written += 1;
        } else {
            self.artifacts_without_output += 1;
        }
    }
}

/// Create a JSON summary of the collection.
///
/// Stored in the archive next to the collected data so the receiving side
/// can tell what was attempted and what actually made it in.
///
/// # Example Output
///
/// ```json
/// {
///   "collection_id": "550e8400-e29b-41d4-a716-446655440000",
///   "hostname": "workstation-01",
///   "archive_name": "insights-workstation-01-20240115143052",
///   "collection_time": "2024-01-15T14:30:52+00:00",
///   "files": { "copied": 12, "failed": 0, "skipped": 3 },
///   "artifacts": { "written": 5, "without_output": 1 },
///   "processors": ["key_value", "line_count"]
/// }
/// ```
pub fn create_collection_summary(
    hostname: &str,
    archive_name: &str,
    stats: &CollectionStats,
    processors: &[&str],
) -> Result<String> {
    let summary = json!({
        "collection_id": Uuid::new_v4().to_string(),
        "hostname": hostname,
        "archive_name": archive_name,
        "collection_time": chrono::Local::now().to_rfc3339(),
        "os": std::env::consts::OS,
        "collector_version": env!("CARGO_PKG_VERSION"),
        "files": {
            "copied": stats.files_copied,
            "failed": stats.files_failed,
            "skipped": stats.files_skipped,
        },
        "artifacts": {
            "written": stats.artifacts_written,
            "without_output": stats.artifacts_without_output,
        },
        "processors": processors,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize collection summary to JSON")
}
