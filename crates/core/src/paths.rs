//! Root directory validation

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a path cannot be used as a sync root
#[derive(Debug, Error)]
pub enum PathError {
    #[error("{} does not exist.", path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a directory.", path.display())]
    NotADirectory { path: PathBuf },

    #[error("{} is inside {}.", path.display(), parent.display())]
    Nested { path: PathBuf, parent: PathBuf },
}

impl PathError {
    /// The offending path
    pub fn path(&self) -> &Path {
        match self {
            PathError::Missing { path, .. }
            | PathError::NotADirectory { path }
            | PathError::Nested { path, .. } => path,
        }
    }
}

/// Check that `path` exists and is a directory
///
/// Symlinks are followed, so a link to a directory is accepted.
pub fn check_directory(path: &Path) -> Result<(), PathError> {
    let metadata = std::fs::metadata(path).map_err(|source| PathError::Missing {
        path: path.to_path_buf(),
        source,
    })?;

    if !metadata.is_dir() {
        return Err(PathError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Check that `inner` is neither `outer` itself nor anywhere below it
///
/// Both paths are resolved first, so symlinks and `..` components count.
pub fn check_disjoint(outer: &Path, inner: &Path) -> Result<(), PathError> {
    let resolve = |path: &Path| {
        std::fs::canonicalize(path).map_err(|source| PathError::Missing {
            path: path.to_path_buf(),
            source,
        })
    };

    if resolve(inner)?.starts_with(resolve(outer)?) {
        return Err(PathError::Nested {
            path: inner.to_path_buf(),
            parent: outer.to_path_buf(),
        });
    }

    Ok(())
}
