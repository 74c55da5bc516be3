//! Artifact descriptors and the output they produce.
//!
//! An artifact is a transient description of one unit of diagnostic data:
//! either a file on the real filesystem or a command whose standard output
//! is captured. Realizing an artifact yields its textual output, or nothing
//! at all when there is no output to store. Absence of output is not an
//! error; the builder simply skips the artifact.
//!
//! ```no_run
//! use insights_archive::artifacts::{Artifact, OutputProvider};
//!
//! let uname = Artifact::command("/usr/bin/uname -a");
//! if let Some(output) = uname.get_output() {
//!     println!("{}", output);
//! }
//! ```

use std::fs;
use std::process::Command;

use log::{debug, warn};

/// Filesystem-safe names derived from command lines
pub mod mangle;

pub use mangle::mangle_command;

/// Anything that can produce the textual content of an artifact.
pub trait OutputProvider {
    /// The artifact's output, or `None` when there is nothing to store.
    fn get_output(&self) -> Option<String>;
}

/// A file to be read and stored in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifact {
    pub path: String,
    pub archive_path: Option<String>,
}

impl FileArtifact {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            archive_path: None,
        }
    }

    pub fn with_archive_path(mut self, archive_path: impl Into<String>) -> Self {
        self.archive_path = Some(archive_path.into());
        self
    }

    /// Destination relative to the archive root when no explicit archive
    /// path was given: the source path without its leading separators.
    pub fn relative_path(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

impl OutputProvider for FileArtifact {
    fn get_output(&self) -> Option<String> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => {
                debug!("File {} is empty", self.path);
                None
            }
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                debug!("File {} could not be read: {}", self.path, e);
                None
            }
        }
    }
}

/// A command whose standard output is stored in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArtifact {
    pub command: String,
    pub archive_path: Option<String>,
}

impl CommandArtifact {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            archive_path: None,
        }
    }

    pub fn with_archive_path(mut self, archive_path: impl Into<String>) -> Self {
        self.archive_path = Some(archive_path.into());
        self
    }

    pub fn mangled_command(&self) -> String {
        mangle_command(&self.command)
    }
}

impl OutputProvider for CommandArtifact {
    /// Runs the command directly (no shell), splitting it on whitespace.
    fn get_output(&self) -> Option<String> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next()?;

        let output = match Command::new(program).args(parts).output() {
            Ok(output) => output,
            Err(e) => {
                debug!("Failed to execute {}: {}", self.command, e);
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                "Command {} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        if output.stdout.is_empty() {
            debug!("Command {} produced no output", self.command);
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// One unit of collected data destined for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    File(FileArtifact),
    Command(CommandArtifact),
}

impl Artifact {
    pub fn file(path: impl Into<String>) -> Self {
        Artifact::File(FileArtifact::new(path))
    }

    pub fn command(command: impl Into<String>) -> Self {
        Artifact::Command(CommandArtifact::new(command))
    }

    /// Explicit archive-relative destination, if one was given.
    pub fn archive_path(&self) -> Option<&str> {
        match self {
            Artifact::File(file) => file.archive_path.as_deref(),
            Artifact::Command(cmd) => cmd.archive_path.as_deref(),
        }
    }

    /// Human readable identity used in log lines.
    pub fn describe(&self) -> &str {
        match self {
            Artifact::File(file) => &file.path,
            Artifact::Command(cmd) => &cmd.command,
        }
    }
}

impl OutputProvider for Artifact {
    fn get_output(&self) -> Option<String> {
        match self {
            Artifact::File(file) => file.get_output(),
            Artifact::Command(cmd) => cmd.get_output(),
        }
    }
}

impl From<FileArtifact> for Artifact {
    fn from(file: FileArtifact) -> Self {
        Artifact::File(file)
    }
}

impl From<CommandArtifact> for Artifact {
    fn from(cmd: CommandArtifact) -> Self {
        Artifact::Command(cmd)
    }
}
