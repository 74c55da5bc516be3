//! Utility functions used around the archive builder.
//!
//! ## Components
//!
//! - **Files**: verbatim writes, glob expansion and tree copies
//! - **Host**: hostname determination for archive naming
//! - **Hashing**: SHA-256 of the packaged archive
//! - **Summary**: collection summary written into the archive
//!
//! ## Common Use Cases
//!
//! ### Expanding a Glob
//!
//! ```no_run
//! use insights_archive::utils::files::expand_paths;
//!
//! for path in expand_paths("/var/log/*.log") {
//!     println!("{}", path.display());
//! }
//! ```
//!
//! ### Hashing a Packaged Archive
//!
//! ```no_run
//! use insights_archive::utils::hash::archive_sha256;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! match archive_sha256(Path::new("/var/tmp/insights-host-20240101120000.tar.gz"), 1024)? {
//!     Some(hash) => println!("SHA-256: {}", hash),
//!     None => println!("Archive exceeds size limit"),
//! }
//! # Ok(())
//! # }
//! ```

/// Filesystem helpers: writes, globs, copies
pub mod files;

/// Hostname determination
pub mod host;

/// Cryptographic hash calculation for packaged archives
pub mod hash;

/// Collection summary generation
pub mod summary;
