//! Global constants for the insights-archive application.
//!
//! This module centralizes the well-known names and limits used by the
//! staging area, the archive builder and the packager.

// Archive layout
/// Prefix of every archive name (`insights-<hostname>-<timestamp>`)
pub const ARCHIVE_NAME_PREFIX: &str = "insights";

/// `chrono` format of the timestamp embedded in archive names
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Subdirectory of the archive tree reserved for command output
pub const COMMAND_DIR_NAME: &str = "insights_commands";

/// Archive-relative path of the serialized processor results
pub const PROCESSOR_OUTPUT_FILE: &str = "output.json";

/// Archive-relative path of the collection summary written by the binary
pub const COLLECTION_SUMMARY_FILE: &str = "collection_summary.json";

// Staging
/// Default parent directory for staging roots
pub const DEFAULT_TEMP_BASE: &str = "/var/tmp";

/// Owner read/write/execute only
pub const OWNER_ONLY_MODE: u32 = 0o700;

/// Attempts at creating a uniquely named staging root before giving up
pub const ROOT_CREATE_ATTEMPTS: usize = 5;

/// Hex characters of a v4 UUID appended to the root name
pub const ROOT_SUFFIX_LEN: usize = 8;

// Naming
/// Maximum length of a mangled command name
pub const MANGLED_NAME_MAX: usize = 255;

/// Fallback hostname when the system one cannot be determined
pub const FALLBACK_HOSTNAME: &str = "localhost";

// Packaging
/// External program used to create the tar stream
pub const TAR_PROGRAM: &str = "tar";

/// Archives larger than this are not hashed after packaging (in MB)
pub const MAX_HASH_SIZE_MB: u64 = 2048;

// Default file names
pub const DEFAULT_PLAN_NAME: &str = "collection_plan.yaml";
