use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::archive::packager::{self, Compressor};
use crate::archive::staging::StagingArea;
use crate::artifacts::{Artifact, OutputProvider};
use crate::constants::{
    ARCHIVE_NAME_PREFIX, ARCHIVE_TIMESTAMP_FORMAT, DEFAULT_TEMP_BASE, MAX_HASH_SIZE_MB,
    PROCESSOR_OUTPUT_FILE,
};
use crate::models::{CopyReport, PackagedArchive};
use crate::processors::{invoke_isolated, InvocationOutcome, ProcessorContext, ProcessorRegistry};
use crate::utils::files::{copy_regular_file, copy_tree, expand_paths, is_glob, is_regular_file, write_data_to_file};
use crate::utils::hash::archive_sha256;
use crate::utils::host::determine_hostname;

/// Settings fixed for the lifetime of one builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub compressor: Compressor,
    /// Overrides the system hostname in archive names and output keys
    pub target_name: Option<String>,
    /// Directory the staging root is created in
    pub temp_base: PathBuf,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compressor: Compressor::Gzip,
            target_name: None,
            temp_base: PathBuf::from(DEFAULT_TEMP_BASE),
        }
    }
}

/// Lifecycle of a builder: staging, then packaged once, then disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Staging,
    Packaged,
    Disposed,
}

/// Accumulates artifacts in a staging tree and packages them into a
/// compressed tar archive.
///
/// Per-artifact problems (missing files, failed copies, artifacts without
/// output, failing processors) are logged and never surface as errors; only
/// staging creation, metadata writes and packaging can fail.
///
/// ```no_run
/// use std::sync::Arc;
/// use insights_archive::archive::{ArchiveBuilder, ArchiveOptions};
/// use insights_archive::artifacts::Artifact;
/// use insights_archive::processors::ProcessorRegistry;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut builder = ArchiveBuilder::new(ArchiveOptions::default(), Arc::new(ProcessorRegistry::new()))?;
/// builder.copy_file("/etc/hosts");
/// builder.add_artifact(&Artifact::command("/usr/bin/uname -a"), Some("uname"));
/// let archive = builder.package(false)?;
/// println!("{} ({} bytes)", archive.path.display(), archive.size);
/// builder.cleanup_root();
/// # Ok(())
/// # }
/// ```
pub struct ArchiveBuilder {
    hostname: String,
    compressor: Compressor,
    staging: StagingArea,
    registry: Arc<ProcessorRegistry>,
    processor_output: BTreeMap<String, Vec<Value>>,
    state: BuilderState,
}

impl ArchiveBuilder {
    /// Create the staging tree. Failing to do so is fatal.
    pub fn new(options: ArchiveOptions, registry: Arc<ProcessorRegistry>) -> Result<Self> {
        let hostname = determine_hostname(options.target_name.as_deref());
        let archive_name = format!(
            "{}-{}-{}",
            ARCHIVE_NAME_PREFIX,
            hostname,
            Local::now().format(ARCHIVE_TIMESTAMP_FORMAT)
        );

        let staging = StagingArea::create(&options.temp_base, &archive_name)
            .context("Failed to create staging area")?;
        info!("Staging {} in {}", archive_name, staging.root().display());

        Ok(Self {
            hostname,
            compressor: options.compressor,
            staging,
            registry,
            processor_output: BTreeMap::new(),
            state: BuilderState::Staging,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn archive_name(&self) -> &str {
        self.staging.archive_name()
    }

    pub fn compressor(&self) -> Compressor {
        self.compressor
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Results accumulated so far, keyed by processor id.
    pub fn processor_output(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.processor_output
    }

    /// Copy a file, or every regular file matching a glob, into the archive
    /// tree at its original path.
    pub fn copy_file(&self, path: &str) -> CopyReport {
        let mut report = CopyReport::default();
        if !self.accepting("copy", path) {
            report.skipped.push(PathBuf::from(path));
            return report;
        }

        // An existing file wins over reading its name as a pattern.
        if is_regular_file(Path::new(path)) {
            self.copy_one(Path::new(path), &mut report);
        } else if is_glob(path) {
            let matches = expand_paths(path);
            if matches.is_empty() {
                debug!("No files match {}", path);
                report.skipped.push(PathBuf::from(path));
            }
            for source in matches {
                self.copy_one(&source, &mut report);
            }
        } else {
            debug!("File {} does not exist", path);
            report.skipped.push(PathBuf::from(path));
        }

        report
    }

    fn copy_one(&self, source: &Path, report: &mut CopyReport) {
        let dest = match self.staging.resolve(&source.to_string_lossy()) {
            Ok(dest) => dest,
            Err(e) => {
                warn!("{:#}", e);
                report.failed.push(source.to_path_buf());
                return;
            }
        };

        debug!("Copying {} to {}", source.display(), dest.display());
        match copy_regular_file(source, &dest) {
            Ok(_) => report.copied.push(source.to_path_buf()),
            Err(e) => {
                warn!("{:#}", e);
                report.failed.push(source.to_path_buf());
            }
        }
    }

    /// Recursively copy each directory into the archive tree at its
    /// original path. Entries that are not directories are skipped.
    pub fn copy_directories<P: AsRef<Path>>(&self, directories: &[P]) -> CopyReport {
        let mut report = CopyReport::default();

        for directory in directories {
            let directory = directory.as_ref();
            if !self.accepting("copy", &directory.to_string_lossy()) || !directory.is_dir() {
                debug!("Not a directory: {}", directory.display());
                report.skipped.push(directory.to_path_buf());
                continue;
            }

            match self.staging.resolve(&directory.to_string_lossy()) {
                Ok(dest) => {
                    debug!("Copying {} to {}", directory.display(), dest.display());
                    report.merge(copy_tree(directory, &dest));
                }
                Err(e) => {
                    warn!("{:#}", e);
                    report.failed.push(directory.to_path_buf());
                }
            }
        }

        report
    }

    /// Write an artifact's output into the archive tree and run the
    /// processors registered under `name` over it.
    ///
    /// Returns the physical path written, or `None` when the artifact had
    /// no output (nothing is written and no processor runs) or could not be
    /// stored.
    pub fn add_artifact(&mut self, artifact: &Artifact, name: Option<&str>) -> Option<PathBuf> {
        if !self.accepting("add", artifact.describe()) {
            return None;
        }

        let dest = match self.artifact_destination(artifact) {
            Ok(dest) => dest,
            Err(e) => {
                warn!("{:#}", e);
                return None;
            }
        };

        let output = artifact.get_output()?;

        if let Err(e) = write_data_to_file(&output, &dest) {
            warn!("{:#}", e);
            return None;
        }
        debug!("Wrote {} to {}", artifact.describe(), dest.display());

        if let Some(name) = name {
            self.execute_processors(name, &output, &dest);
        }

        Some(dest)
    }

    fn artifact_destination(&self, artifact: &Artifact) -> Result<PathBuf> {
        if let Some(archive_path) = artifact.archive_path() {
            return self.staging.resolve(archive_path);
        }

        match artifact {
            Artifact::Command(cmd) => {
                let mangled = cmd.mangled_command();
                if mangled.is_empty() {
                    bail!("Command '{}' has no usable name", cmd.command);
                }
                Ok(self.staging.command_dir().join(mangled))
            }
            Artifact::File(file) => self.staging.resolve(file.relative_path()),
        }
    }

    fn execute_processors(&mut self, name: &str, output: &str, path: &Path) {
        let registry = Arc::clone(&self.registry);
        let processors = registry.lookup(name);
        if processors.is_empty() {
            return;
        }

        for processor in processors {
            let ctx = ProcessorContext::new(output, path);
            let outcome = invoke_isolated(processor.as_ref(), &ctx);
            debug!("Processor {} on {}: {}", processor.id(), name, outcome);

            if let InvocationOutcome::Failure(cause) = &outcome {
                warn!("Processor {} failed on {}: {}", processor.id(), path.display(), cause);
            }
            if let Some(value) = outcome.into_result() {
                self.processor_output
                    .entry(processor.id().to_string())
                    .or_default()
                    .push(value);
            }
        }
    }

    /// Write `content` verbatim at `archive_path`. Processors never run on
    /// metadata.
    pub fn add_metadata(&self, content: impl AsRef<[u8]>, archive_path: &str) -> Result<PathBuf> {
        if self.state != BuilderState::Staging {
            bail!("Cannot add metadata to {}: archive already packaged", self.archive_name());
        }

        let dest = self.staging.resolve(archive_path)?;
        write_data_to_file(content, &dest)?;
        debug!("Wrote metadata {}", dest.display());
        Ok(dest)
    }

    /// Serialize `{hostname: {processor_id: [results]}}` to `output.json`.
    ///
    /// `package` calls this itself; calling it afterwards is an error.
    pub fn write_processor_output(&self) -> Result<PathBuf> {
        if self.state != BuilderState::Staging {
            bail!("Cannot write processor output for {}: archive already packaged", self.archive_name());
        }

        let mut by_host = Map::new();
        by_host.insert(
            self.hostname.clone(),
            serde_json::to_value(&self.processor_output)
                .context("Failed to serialize processor output")?,
        );

        let serialized = serde_json::to_string_pretty(&Value::Object(by_host))
            .context("Failed to serialize processor output")?;
        let dest = self.staging.resolve(PROCESSOR_OUTPUT_FILE)?;
        write_data_to_file(serialized, &dest)?;
        Ok(dest)
    }

    /// Physical path of the archive `package` produces.
    pub fn tar_file_path(&self) -> PathBuf {
        self.staging
            .root()
            .join(format!("{}{}", self.archive_name(), self.compressor.extension()))
    }

    /// Write the processor output, tar the archive directory (or the whole
    /// root when `full_archive` is set) and delete the archive directory.
    ///
    /// The archive directory is deleted whether or not tar succeeded; on
    /// failure the whole root goes with it. Can only be called once.
    pub fn package(&mut self, full_archive: bool) -> Result<PackagedArchive> {
        if self.state != BuilderState::Staging {
            bail!("Archive {} has already been packaged", self.archive_name());
        }

        match self.try_package(full_archive) {
            Ok(archive) => {
                self.state = BuilderState::Packaged;
                Ok(archive)
            }
            Err(e) => {
                self.cleanup_root();
                Err(e)
            }
        }
    }

    fn try_package(&self, full_archive: bool) -> Result<PackagedArchive> {
        if !self.staging.archive_dir().is_dir() {
            bail!(
                "Staging directory {} no longer exists",
                self.staging.archive_dir().display()
            );
        }

        let tar_file = self.tar_file_path();
        let source = if full_archive {
            self.staging.root()
        } else {
            self.staging.archive_dir()
        };
        debug!("Tar File: {}", tar_file.display());

        let result = self
            .write_processor_output()
            .and_then(|_| packager::create_tar(&tar_file, source, self.compressor));

        self.staging.cleanup_archive_dir();
        result.context(format!("Failed to package {}", self.archive_name()))?;

        let size = fs::metadata(&tar_file)
            .context(format!("Failed to stat {}", tar_file.display()))?
            .len();
        let sha256 = match archive_sha256(&tar_file, MAX_HASH_SIZE_MB) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Failed to hash {}: {:#}", tar_file.display(), e);
                None
            }
        };
        info!("Tar File Size: {} bytes ({})", size, tar_file.display());

        Ok(PackagedArchive {
            path: tar_file,
            size,
            sha256,
        })
    }

    /// Delete the whole staging root, including the packaged archive.
    pub fn cleanup_root(&mut self) {
        self.staging.cleanup_root();
        self.state = BuilderState::Disposed;
    }

    fn accepting(&self, action: &str, what: &str) -> bool {
        if self.state == BuilderState::Staging {
            return true;
        }
        warn!("Ignoring {} of {}: archive already packaged", action, what);
        false
    }
}

impl Drop for ArchiveBuilder {
    fn drop(&mut self) {
        // A packaged root holds the caller's archive; anything else is scratch.
        // Failed packaging has already removed the root.
        if self.state == BuilderState::Staging {
            self.staging.cleanup_root();
        }
    }
}
