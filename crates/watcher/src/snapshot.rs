//! Tree snapshots and snapshot diffing
//!
//! Each poll tick captures a full [`FileSnapshot`] of the watched tree and
//! diffs it against the previous one. Snapshots are replaced wholesale, never
//! patched.
//!
//! Renames are detected through file identity: on unix a remove and a create
//! that share `(dev, inode)` collapse into one `Rename` (same parent) or
//! `Move` (different parent) event. Where no identity is available the pair
//! stays a plain `Remove` + `Create`.

use crate::{ChangeEvent, EventKind, WatchError};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use syncr_core::check_directory;
use tracing::debug;
use walkdir::WalkDir;

/// Identity of a file that survives renames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    pub dev: u64,
    pub ino: u64,
}

/// Per-path state recorded in a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub mod_time: SystemTime,
    pub size: u64,
    pub is_dir: bool,
    pub id: Option<FileId>,
}

impl FileInfo {
    fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            mod_time: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
            is_dir: metadata.is_dir(),
            id: file_id(metadata),
        }
    }
}

#[cfg(unix)]
fn file_id(metadata: &Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileId {
        dev: metadata.dev(),
        ino: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn file_id(_metadata: &Metadata) -> Option<FileId> {
    None
}

/// Full state of a watched tree at one instant
#[derive(Debug, Clone, Default)]
pub struct FileSnapshot {
    entries: BTreeMap<PathBuf, FileInfo>,
}

impl FileSnapshot {
    /// Walk `root` and record every entry below it
    ///
    /// `root` should already be absolute so keys stay stable between ticks.
    /// A symlinked root is followed. Entries that vanish mid-walk are skipped; failing to
    /// read the root itself is fatal.
    pub fn capture(root: &Path, recursive: bool) -> Result<Self, WatchError> {
        check_directory(root)?;
        fs::read_dir(root).map_err(|source| WatchError::Enumerate {
            path: root.to_path_buf(),
            source,
        })?;

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut entries = BTreeMap::new();

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .follow_root_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(WatchError::Enumerate {
                        path: root.to_path_buf(),
                        source: err.into(),
                    });
                }
                Err(err) => {
                    debug!("Skipping unreadable entry during snapshot: {}", err);
                    continue;
                }
            };

            match entry.metadata() {
                Ok(metadata) => {
                    entries.insert(entry.into_path(), FileInfo::from_metadata(&metadata));
                }
                Err(err) => debug!("Entry vanished during snapshot: {}", err),
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&FileInfo> {
        self.entries.get(path)
    }

    /// Classify every difference between `self` (older) and `newer`
    ///
    /// Events come out grouped by kind (writes, renames/moves, creates,
    /// removes) and sorted by path within each group. No filtering happens
    /// here; directory events are included.
    pub fn diff(&self, newer: &FileSnapshot, timestamp: SystemTime) -> Vec<ChangeEvent> {
        let mut writes = Vec::new();
        let mut removed: Vec<(&PathBuf, &FileInfo)> = Vec::new();
        let mut created: BTreeMap<&PathBuf, &FileInfo> = BTreeMap::new();

        for (path, old) in &self.entries {
            match newer.entries.get(path) {
                // A file replaced by a directory (or the reverse) is not a write
                Some(new) if new.is_dir != old.is_dir => {
                    removed.push((path, old));
                    created.insert(path, new);
                }
                Some(new) if new.mod_time != old.mod_time || new.size != old.size => {
                    writes.push(ChangeEvent::new(EventKind::Write, path.clone(), new.is_dir, timestamp));
                }
                Some(_) => {}
                None => removed.push((path, old)),
            }
        }

        for (path, new) in &newer.entries {
            if !self.entries.contains_key(path) {
                created.insert(path, new);
            }
        }

        // Pair removes with creates that carry the same identity
        let created_ids: HashMap<FileId, &PathBuf> = created
            .iter()
            .filter_map(|(path, info)| info.id.map(|id| (id, *path)))
            .collect();

        let mut renames = Vec::new();
        let mut removes = Vec::new();

        for (old_path, old) in removed {
            let partner = old
                .id
                .and_then(|id| created_ids.get(&id))
                .copied()
                .filter(|new_path| *new_path != old_path)
                .filter(|new_path| created.get(new_path).is_some_and(|new| new.is_dir == old.is_dir));

            match partner {
                Some(new_path) => {
                    created.remove(new_path);
                    let kind = if new_path.parent() == old_path.parent() {
                        EventKind::Rename
                    } else {
                        EventKind::Move
                    };
                    let mut event = ChangeEvent::new(kind, new_path.clone(), old.is_dir, timestamp);
                    event.old_path = Some(old_path.clone());
                    renames.push(event);
                }
                None => removes.push(ChangeEvent::new(
                    EventKind::Remove,
                    old_path.clone(),
                    old.is_dir,
                    timestamp,
                )),
            }
        }

        let creates = created
            .into_iter()
            .map(|(path, info)| ChangeEvent::new(EventKind::Create, path.clone(), info.is_dir, timestamp));

        let mut events = writes;
        events.extend(renames);
        events.extend(creates);
        events.extend(removes);
        events
    }
}
