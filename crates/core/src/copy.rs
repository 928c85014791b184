//! Best-effort recursive tree copy
//!
//! Reproduces a source directory (structure, contents, permission bits) at a
//! target path. Failures on individual entries are collected into the
//! [`CopyReport`] instead of aborting the walk, so a source tree that is still
//! being edited while a pass runs costs a few errors, not the whole pass.
//!
//! The copy is additive: entries that exist only in the destination are left
//! untouched.

use std::fs::{self, File, Permissions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Failure that prevents a copy pass from starting at all
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("source {} is unavailable: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source {} is not a directory", path.display())]
    SourceNotDirectory { path: PathBuf },

    #[error("target {} could not be created: {source}", path.display())]
    TargetUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single entry that could not be copied
#[derive(Debug, Error)]
#[error("{}: {source}", path.display())]
pub struct CopyFailure {
    /// Entry the failure concerns
    pub path: PathBuf,
    /// Underlying I/O error
    #[source]
    pub source: io::Error,
}

/// Outcome of one copy pass
#[derive(Debug, Default)]
pub struct CopyReport {
    /// Regular files written to the destination
    pub files_copied: usize,
    /// Directories created in the destination (including the root)
    pub dirs_created: usize,
    /// Total bytes written
    pub bytes_copied: u64,
    /// Per-entry failures, in walk order
    pub errors: Vec<CopyFailure>,
}

impl CopyReport {
    /// True if every entry was copied
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, path: PathBuf, source: io::Error) {
        warn!("Copy failed for {}: {}", path.display(), source);
        self.errors.push(CopyFailure { path, source });
    }
}

/// Walks a source tree and mirrors it at a destination
#[derive(Debug, Clone)]
pub struct RecursiveCopier {
    preserve_permissions: bool,
}

impl Default for RecursiveCopier {
    fn default() -> Self {
        Self {
            preserve_permissions: true,
        }
    }
}

impl RecursiveCopier {
    /// Create a copier that preserves permission bits
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable copying of permission bits
    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    /// Copy the whole tree under `src` into `dst`
    ///
    /// Returns `Err` only when `src` is not a readable directory or `dst`
    /// cannot be created. Everything else lands in [`CopyReport::errors`].
    pub fn copy(&self, src: &Path, dst: &Path) -> Result<CopyReport, CopyError> {
        let src_meta = fs::metadata(src).map_err(|source| CopyError::SourceUnavailable {
            path: src.to_path_buf(),
            source,
        })?;
        if !src_meta.is_dir() {
            return Err(CopyError::SourceNotDirectory {
                path: src.to_path_buf(),
            });
        }

        let mut report = CopyReport::default();

        // Directories this pass created, with the source bits to apply once
        // their children are written.
        let mut created_dirs: Vec<(PathBuf, Permissions)> = Vec::new();

        let dst_existed = dst.is_dir();
        fs::create_dir_all(dst).map_err(|source| CopyError::TargetUnavailable {
            path: dst.to_path_buf(),
            source,
        })?;
        if !dst_existed {
            report.dirs_created += 1;
            created_dirs.push((dst.to_path_buf(), src_meta.permissions()));
        }

        // A destination under the source must not be walked into, or each
        // directory this pass creates would be copied again below itself
        let nested_dst = match nested_path(src, dst)? {
            Some(rel) if rel.as_os_str().is_empty() => {
                debug!("Source and destination are both {}, nothing to copy", src.display());
                return Ok(report);
            }
            Some(rel) => Some(src.join(rel)),
            None => None,
        };

        let mut walker = WalkDir::new(src)
            .min_depth(1)
            .follow_links(false)
            .follow_root_links(true)
            .into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| src.to_path_buf());
                    report.record(path, err.into());
                    continue;
                }
            };

            if entry.file_type().is_dir() && nested_dst.as_deref() == Some(entry.path()) {
                debug!("Skipping destination {} inside source", entry.path().display());
                walker.skip_current_dir();
                continue;
            }

            let Ok(rel_path) = entry.path().strip_prefix(src) else {
                continue;
            };
            let target = dst.join(rel_path);

            if entry.file_type().is_dir() {
                match create_dir(&target) {
                    Ok(true) => {
                        report.dirs_created += 1;
                        if self.preserve_permissions {
                            match entry.metadata() {
                                Ok(meta) => created_dirs.push((target, meta.permissions())),
                                Err(err) => report.record(entry.path().to_path_buf(), err.into()),
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(err) => {
                        // Nothing below can land without its parent
                        report.record(entry.path().to_path_buf(), err);
                        walker.skip_current_dir();
                    }
                }
            } else {
                match self.copy_file(entry.path(), &target) {
                    Ok(bytes) => {
                        report.files_copied += 1;
                        report.bytes_copied += bytes;
                    }
                    Err(err) => report.record(entry.path().to_path_buf(), err),
                }
            }
        }

        if self.preserve_permissions {
            // Pre-order walk, so reversing puts children before parents
            for (dir, permissions) in created_dirs.into_iter().rev() {
                if let Err(err) = fs::set_permissions(&dir, permissions) {
                    report.record(dir, err);
                }
            }
        }

        debug!(
            "Copied {} -> {}: {} files, {} dirs, {} bytes, {} errors",
            src.display(),
            dst.display(),
            report.files_copied,
            report.dirs_created,
            report.bytes_copied,
            report.errors.len()
        );

        Ok(report)
    }

    /// Copy one file byte-for-byte, then mirror its permission bits
    ///
    /// Symlinks are followed. Anything that does not resolve to a regular
    /// file (FIFOs, sockets, device nodes) is refused before it is opened,
    /// since opening a FIFO blocks until a writer shows up.
    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        let metadata = fs::metadata(src)?;
        if metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "symlinked directory is not followed",
            ));
        }
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "not a regular file",
            ));
        }

        let mut reader = File::open(src)?;

        let mut writer = match File::create(dst) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied && is_readonly(dst) => {
                make_writable(dst)?;
                File::create(dst)?
            }
            Err(err) => return Err(err),
        };

        let bytes = io::copy(&mut reader, &mut writer)?;
        drop(writer);

        if self.preserve_permissions {
            fs::set_permissions(dst, metadata.permissions())?;
        }

        Ok(bytes)
    }
}

/// Where `dst` sits below `src`, as a path relative to `src`
///
/// Both sides are resolved first so that symlinks and `..` cannot hide the
/// nesting. `Some("")` means they are the same directory.
fn nested_path(src: &Path, dst: &Path) -> Result<Option<PathBuf>, CopyError> {
    let src_real = fs::canonicalize(src).map_err(|source| CopyError::SourceUnavailable {
        path: src.to_path_buf(),
        source,
    })?;
    let dst_real = fs::canonicalize(dst).map_err(|source| CopyError::TargetUnavailable {
        path: dst.to_path_buf(),
        source,
    })?;

    Ok(dst_real
        .strip_prefix(&src_real)
        .ok()
        .map(Path::to_path_buf))
}

/// Create a single directory; `Ok(false)` if it was already there
fn create_dir(path: &Path) -> io::Result<bool> {
    match fs::create_dir(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
        Err(err) => Err(err),
    }
}

fn is_readonly(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.permissions().readonly())
        .unwrap_or(false)
}

/// Grant the owner write access to an existing file
fn make_writable(path: &Path) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }

    #[cfg(not(unix))]
    {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
    }

    fs::set_permissions(path, permissions)
}
