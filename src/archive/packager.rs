use std::fmt;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use log::{debug, warn};

use crate::constants::TAR_PROGRAM;

/// Compression applied to the tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compressor {
    #[default]
    Gzip,
    Xz,
    Bzip2,
    None,
}

impl Compressor {
    /// Parse a compressor name. Unknown names fall back to gzip.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "gz" => Compressor::Gzip,
            "xz" => Compressor::Xz,
            "bz2" => Compressor::Bzip2,
            "none" => Compressor::None,
            other => {
                warn!("Unknown compressor '{}', using gz", other);
                Compressor::Gzip
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Compressor::Gzip => "gz",
            Compressor::Xz => "xz",
            Compressor::Bzip2 => "bz2",
            Compressor::None => "none",
        }
    }

    /// Letter passed to tar in create mode.
    pub fn tar_flag(&self) -> &'static str {
        match self {
            Compressor::Gzip => "z",
            Compressor::Xz => "J",
            Compressor::Bzip2 => "j",
            Compressor::None => "",
        }
    }

    /// File extension of the produced archive, including `.tar`.
    pub fn extension(&self) -> &'static str {
        match self {
            Compressor::Gzip => ".tar.gz",
            Compressor::Xz => ".tar.xz",
            Compressor::Bzip2 => ".tar.bz2",
            Compressor::None => ".tar",
        }
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// tar flag for a compressor name, `z` for anything unrecognized.
pub fn compression_flag(compressor: &str) -> &'static str {
    Compressor::from_name(compressor).tar_flag()
}

/// Archive everything under `source_dir` into `tar_file` with the system
/// tar, equivalent to `tar c<flag>fS <tar_file> -C <source_dir> .`.
///
/// Exit status 1 is GNU tar's "some files differ" (e.g. the archive file
/// itself sitting in the tree being archived) and is only logged. Any other
/// failure, or a tar file that was not produced, is an error.
pub fn create_tar(tar_file: &Path, source_dir: &Path, compressor: Compressor) -> Result<()> {
    let mode = format!("c{}fS", compressor.tar_flag());
    debug!(
        "Running {} {} {} -C {} .",
        TAR_PROGRAM,
        mode,
        tar_file.display(),
        source_dir.display()
    );

    let output = Command::new(TAR_PROGRAM)
        .arg(&mode)
        .arg(tar_file)
        .arg("-C")
        .arg(source_dir)
        .arg(".")
        .output()
        .context(format!("Failed to execute {}", TAR_PROGRAM))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    match output.status.code() {
        Some(0) => {}
        Some(1) => warn!("{} reported differences: {}", TAR_PROGRAM, stderr.trim()),
        _ => bail!(
            "{} failed for {} ({}): {}",
            TAR_PROGRAM,
            source_dir.display(),
            output.status,
            stderr.trim()
        ),
    }

    if !tar_file.is_file() {
        bail!("{} did not produce {}", TAR_PROGRAM, tar_file.display());
    }

    Ok(())
}
