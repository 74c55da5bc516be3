//! # insights-archive
//!
//! Staging and packaging of diagnostic collections into compressed tar
//! archives.
//!
//! ## Overview
//!
//! An [`archive::ArchiveBuilder`] owns a private staging tree under a temporary
//! base directory. Collected files, command output and metadata are written
//! into that tree; pluggable processors may inspect each artifact's output and
//! contribute derived JSON results. Packaging writes the accumulated results
//! to `output.json`, runs `tar` with the selected compression and deletes the
//! staged tree, leaving only the archive behind.
//!
//! ## Features
//!
//! - **Private staging**: owner-only directories with unique names
//! - **Path containment**: archive paths can never escape the staging tree
//! - **Processor isolation**: a failing processor never aborts ingestion
//! - **Compression**: gzip, xz, bzip2 or none
//! - **Flexible configuration**: YAML collection plans
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use insights_archive::archive::{ArchiveBuilder, ArchiveOptions, Compressor};
//! use insights_archive::artifacts::Artifact;
//! use insights_archive::processors::ProcessorRegistry;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut registry = ProcessorRegistry::new();
//! registry.register_fn("uname", "kernel_lines", |ctx| {
//!     Ok(Some(serde_json::json!(ctx.content.len())))
//! });
//!
//! let options = ArchiveOptions {
//!     compressor: Compressor::Xz,
//!     ..Default::default()
//! };
//! let mut builder = ArchiveBuilder::new(options, Arc::new(registry))?;
//! builder.copy_file("/etc/hosts");
//! builder.add_artifact(&Artifact::command("/usr/bin/uname -a"), Some("uname"));
//!
//! let archive = builder.package(false)?;
//! println!("{}", archive.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`archive`]: staging area, archive builder and tar packaging
//! - [`artifacts`]: file and command artifacts and their archive names
//! - [`processors`]: processor trait, adapters, registry and built-ins
//! - [`config`]: YAML collection plans
//! - [`cli`]: command-line interface definitions
//! - [`models`]: copy reports and packaged archive descriptions
//! - [`utils`]: file, host, hashing and summary helpers
//! - [`constants`]: well-known names and limits

/// Staging area, archive builder and packaging
pub mod archive;

/// Collected artifacts and how they are realized
pub mod artifacts;

/// Pluggable per-artifact processors
pub mod processors;

/// Collection plan loading and defaults
pub mod config;

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models
pub mod models;

/// Utility functions for file operations, hashing and summaries
pub mod utils;

/// Application constants
pub mod constants;
