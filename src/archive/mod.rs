//! Archive lifecycle: staging, ingestion, processing and packaging.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             ArchiveBuilder              │
//! │  copy_file / copy_directories           │
//! │  add_artifact ──► ProcessorRegistry     │
//! │  add_metadata                           │
//! │  package ──► output.json ──► tar        │
//! ├─────────────────────────────────────────┤
//! │              StagingArea                │
//! │  root / archive dir / command dir       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A builder moves through `Staging → Packaged → Disposed`. Ingestion is
//! only accepted while staging; `package` runs once and always removes the
//! archive directory; `cleanup_root` removes the root and the archive in it.

/// The orchestrating archive builder
pub mod builder;

/// Compression selection and the external tar step
pub mod packager;

/// Staging directory tree and path mapping
pub mod staging;

pub use builder::{ArchiveBuilder, ArchiveOptions, BuilderState};
pub use packager::Compressor;
pub use staging::StagingArea;
