use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveOptions, Compressor};
use crate::artifacts::{Artifact, CommandArtifact, FileArtifact};
use crate::config::env_vars::expand_env_vars;
use crate::constants::DEFAULT_TEMP_BASE;
use crate::processors::builtin::register_builtin;
use crate::processors::ProcessorRegistry;

/// One artifact to realize and store, as written in a plan.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArtifactSpec {
    File {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        archive_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Command {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        archive_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl ArtifactSpec {
    /// Logical name processors are looked up under.
    pub fn name(&self) -> Option<&str> {
        match self {
            ArtifactSpec::File { name, .. } | ArtifactSpec::Command { name, .. } => name.as_deref(),
        }
    }

    pub fn to_artifact(&self) -> Artifact {
        match self {
            ArtifactSpec::File { path, archive_path, .. } => Artifact::File(FileArtifact {
                path: path.clone(),
                archive_path: archive_path.clone(),
            }),
            ArtifactSpec::Command { command, archive_path, .. } => Artifact::Command(CommandArtifact {
                command: command.clone(),
                archive_path: archive_path.clone(),
            }),
        }
    }
}

/// Content written verbatim into the archive.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub path: String,
    pub content: String,
}

/// What to collect and how to package it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CollectionPlan {
    pub version: String,
    pub description: String,
    /// `gz`, `xz`, `bz2` or `none`; anything else means `gz`
    #[serde(default = "default_compressor")]
    pub compressor: String,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default = "default_temp_base")]
    pub temp_base: PathBuf,
    #[serde(default)]
    pub full_archive: bool,
    /// Literal paths or globs
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactSpec>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    /// Logical artifact name -> built-in processor ids
    #[serde(default)]
    pub processors: BTreeMap<String, Vec<String>>,
}

fn default_compressor() -> String {
    Compressor::Gzip.name().to_string()
}

fn default_temp_base() -> PathBuf {
    PathBuf::from(DEFAULT_TEMP_BASE)
}

impl Default for CollectionPlan {
    fn default() -> Self {
        let mut processors = BTreeMap::new();
        processors.insert("os_release".to_string(), vec!["key_value".to_string()]);
        processors.insert("uname".to_string(), vec!["line_count".to_string()]);

        Self {
            version: "1.0".to_string(),
            description: "Default diagnostic collection".to_string(),
            compressor: default_compressor(),
            target_name: None,
            temp_base: default_temp_base(),
            full_archive: false,
            files: vec!["/etc/hostname".to_string(), "/etc/hosts".to_string()],
            directories: vec![],
            artifacts: vec![
                ArtifactSpec::File {
                    path: "/etc/os-release".to_string(),
                    archive_path: None,
                    name: Some("os_release".to_string()),
                },
                ArtifactSpec::Command {
                    command: "/usr/bin/uname -a".to_string(),
                    archive_path: None,
                    name: Some("uname".to_string()),
                },
                ArtifactSpec::Command {
                    command: "/bin/hostname".to_string(),
                    archive_path: None,
                    name: None,
                },
            ],
            metadata: vec![],
            processors,
        }
    }
}

impl CollectionPlan {
    /// Load a plan from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read plan file: {}", path.display()))?;

        let plan: CollectionPlan =
            serde_yaml::from_str(&content).context("Failed to parse YAML plan")?;

        debug!("Loaded collection plan from {}", path.display());
        Ok(plan)
    }

    /// Save the plan to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize plan to YAML")?;

        fs::write(path, yaml).context(format!("Failed to write plan to {}", path.display()))?;

        info!("Saved collection plan to {}", path.display());
        Ok(())
    }

    /// Expand `$VAR` / `${VAR}` in every path and command of the plan.
    ///
    /// Commands run without a shell, so this is the only expansion they get.
    /// Metadata content is written verbatim.
    pub fn process_environment_variables(&mut self) {
        for file in &mut self.files {
            *file = expand_env_vars(file);
        }
        for directory in &mut self.directories {
            *directory = expand_env_vars(directory);
        }
        for artifact in &mut self.artifacts {
            let (source, archive_path) = match artifact {
                ArtifactSpec::File { path, archive_path, .. } => (path, archive_path),
                ArtifactSpec::Command { command, archive_path, .. } => (command, archive_path),
            };
            *source = expand_env_vars(source);
            if let Some(archive_path) = archive_path {
                *archive_path = expand_env_vars(archive_path);
            }
        }
        for entry in &mut self.metadata {
            entry.path = expand_env_vars(&entry.path);
        }
        self.temp_base = PathBuf::from(expand_env_vars(&self.temp_base.to_string_lossy()));
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            compressor: Compressor::from_name(&self.compressor),
            target_name: self.target_name.clone(),
            temp_base: self.temp_base.clone(),
        }
    }

    /// Build the processor registry the plan asks for.
    pub fn build_registry(&self) -> Result<ProcessorRegistry> {
        let mut registry = ProcessorRegistry::new();
        for (name, ids) in &self.processors {
            for id in ids {
                register_builtin(&mut registry, name, id)
                    .context(format!("Invalid processor for '{}'", name))?;
            }
        }
        Ok(registry)
    }
}

/// Load the plan at `path`, or fall back to the built-in default.
///
/// A path that does not exist is an error rather than a silent fallback:
/// collecting the wrong set of files is worse than collecting none.
pub fn load_or_default(path: Option<&Path>) -> Result<CollectionPlan> {
    match path {
        Some(path) => CollectionPlan::from_yaml_file(path),
        None => {
            info!("No plan given, using default collection plan");
            Ok(CollectionPlan::default())
        }
    }
}
