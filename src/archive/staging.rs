use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use uuid::Uuid;

use crate::constants::{COMMAND_DIR_NAME, OWNER_ONLY_MODE, ROOT_CREATE_ATTEMPTS, ROOT_SUFFIX_LEN};

/// The on-disk tree an archive is assembled in.
///
/// ```text
/// <temp_base>/<archive_name>-<suffix>/        root (owner-only)
///     <archive_name>/                         archive dir
///         insights_commands/                  command output
///         ...                                 staged files
///     <archive_name>.tar.gz                   produced by packaging
/// ```
///
/// Every path handed out by [`StagingArea::resolve`] lies under the archive
/// directory. The root outlives the archive directory because it holds the
/// packaged archive until the caller disposes of it.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    archive_name: String,
    archive_dir: PathBuf,
    command_dir: PathBuf,
}

impl StagingArea {
    /// Create the root, archive and command directories.
    ///
    /// Any failure here is fatal: nothing can be collected without a
    /// writable staging tree.
    pub fn create(temp_base: &Path, archive_name: &str) -> Result<Self> {
        let root = create_root(temp_base, archive_name)?;

        let archive_dir = match create_archive_dir(&root, archive_name) {
            Ok(dir) => dir,
            Err(e) => {
                remove_tree(&root);
                return Err(e);
            }
        };
        let command_dir = match create_command_dir(&archive_dir) {
            Ok(dir) => dir,
            Err(e) => {
                remove_tree(&root);
                return Err(e);
            }
        };

        debug!("Staging area created at {}", root.display());
        Ok(Self {
            root,
            archive_name: archive_name.to_string(),
            archive_dir,
            command_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn command_dir(&self) -> &Path {
        &self.command_dir
    }

    /// Map an archive-relative path to its physical location.
    ///
    /// Leading separators are dropped, so `/etc/hosts` and `etc/hosts`
    /// resolve to the same file. `..` components are rejected. Parent
    /// directories are not created.
    pub fn resolve(&self, archive_path: &str) -> Result<PathBuf> {
        resolve_under(&self.archive_dir, archive_path)
    }

    /// Remove the archive directory. Missing trees are fine.
    pub fn cleanup_archive_dir(&self) {
        debug!("Deleting: {}", self.archive_dir.display());
        remove_tree(&self.archive_dir);
    }

    /// Remove the whole root, including any packaged archive in it.
    pub fn cleanup_root(&self) {
        debug!("Deleting: {}", self.root.display());
        remove_tree(&self.root);
    }
}

/// Join `relative` onto `base`, dropping root and prefix components.
pub fn resolve_under(base: &Path, relative: &str) -> Result<PathBuf> {
    let mut resolved = base.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                bail!("Archive path escapes the staging tree: {}", relative)
            }
        }
    }

    Ok(resolved)
}

/// Create a uniquely named, owner-only root directory under `temp_base`.
pub fn create_root(temp_base: &Path, archive_name: &str) -> Result<PathBuf> {
    let mut last_error = None;

    for _ in 0..ROOT_CREATE_ATTEMPTS {
        let suffix = Uuid::new_v4().simple().to_string();
        let root = temp_base.join(format!("{}-{}", archive_name, &suffix[..ROOT_SUFFIX_LEN]));

        match owner_only_dir_builder(false).create(&root) {
            Ok(()) => return Ok(root),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Staging root {} already exists, retrying", root.display());
                last_error = Some(e);
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Failed to create staging root under {}",
                    temp_base.display()
                ))
            }
        }
    }

    let e = last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists));
    Err(e).context(format!(
        "Failed to create a unique staging root under {} after {} attempts",
        temp_base.display(),
        ROOT_CREATE_ATTEMPTS
    ))
}

/// Create the archive directory inside the root.
pub fn create_archive_dir(root: &Path, archive_name: &str) -> Result<PathBuf> {
    let archive_dir = root.join(archive_name);
    owner_only_dir_builder(true)
        .create(&archive_dir)
        .context(format!("Failed to create archive directory {}", archive_dir.display()))?;
    Ok(archive_dir)
}

/// Create the command output directory inside the archive directory.
pub fn create_command_dir(archive_dir: &Path) -> Result<PathBuf> {
    let command_dir = archive_dir.join(COMMAND_DIR_NAME);
    owner_only_dir_builder(true)
        .create(&command_dir)
        .context(format!("Failed to create command directory {}", command_dir.display()))?;
    Ok(command_dir)
}

fn owner_only_dir_builder(recursive: bool) -> fs::DirBuilder {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(recursive);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(OWNER_ONLY_MODE);
    }

    builder
}

fn remove_tree(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
    }
}
