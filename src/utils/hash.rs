use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// SHA-256 of a packaged archive, hex encoded.
///
/// Returns `Ok(None)` when the path is not a regular file or is larger than
/// `max_size_mb`; hashing multi-gigabyte archives only to log the digest is
/// not worth the extra pass over the data.
pub fn archive_sha256(path: &Path, max_size_mb: u64) -> Result<Option<String>> {
    let metadata = std::fs::metadata(path)
        .context(format!("Failed to stat {}", path.display()))?;

    if !metadata.is_file() || metadata.len() > max_size_mb * 1024 * 1024 {
        return Ok(None);
    }

    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).context(format!("Failed to read {}", path.display()))?;

    Ok(Some(format!("{:x}", hasher.finalize())))
}
