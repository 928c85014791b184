//! File system watching for Syncr
//!
//! This crate provides portable, polling-based change detection with:
//! - Regex path filtering on leaf files
//! - Snapshot diffing (create / write / remove / rename / move)
//! - Single-slot event coalescing
//! - A terminal `Idle -> Watching -> Closed` lifecycle

pub mod coalesce;
pub mod filter;
pub mod poll;
pub mod snapshot;

pub use coalesce::{Mailbox, PostOutcome};
pub use filter::{FilterError, PathMatcher};
pub use poll::{ChangeWatcher, WatchHandle, WatchState};
pub use snapshot::{FileId, FileInfo, FileSnapshot};

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use syncr_core::PathError;
use thiserror::Error;

/// Default time between two poll ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default cap on events emitted per tick
pub const DEFAULT_MAX_EVENTS: usize = 1;

/// What to watch and how
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    /// Root of the watched tree
    pub root: PathBuf,
    /// Descend into sub-directories
    pub recursive: bool,
    /// Time between poll ticks
    pub poll_interval: Duration,
    /// Which leaf files produce events
    pub filter: PathMatcher,
    /// Events emitted per tick (0 = no cap)
    pub max_events: usize,
}

impl WatchTarget {
    /// Watch `root` recursively with the default interval and event cap
    pub fn new(root: impl Into<PathBuf>, filter: PathMatcher) -> Self {
        Self {
            root: root.into(),
            recursive: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            filter,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }
}

/// Fatal watcher errors
///
/// Any of these ends the watch; nothing is retried.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch root rejected: {0}")]
    InvalidRoot(#[from] PathError),

    #[error("cannot enumerate watch root {}: {source}", path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("watcher is already running")]
    AlreadyWatching,

    #[error("watcher has not been started")]
    NotStarted,

    #[error("watcher is closed")]
    Closed,

    #[error("snapshot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    /// Path appeared
    Create,
    /// Contents changed (mtime or size)
    Write,
    /// Path disappeared
    Remove,
    /// Same file, new name in the same directory
    Rename,
    /// Same file, different directory
    Move,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Create => "CREATE",
            EventKind::Write => "WRITE",
            EventKind::Remove => "REMOVE",
            EventKind::Rename => "RENAME",
            EventKind::Move => "MOVE",
        };
        f.write_str(name)
    }
}

/// File system event
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Path that changed (the new path for renames and moves)
    pub path: PathBuf,
    /// Previous path for renames and moves
    pub old_path: Option<PathBuf>,
    /// Type of change
    pub kind: EventKind,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// When the tick that detected the change ran
    pub timestamp: SystemTime,
}

impl ChangeEvent {
    pub fn new(kind: EventKind, path: PathBuf, is_dir: bool, timestamp: SystemTime) -> Self {
        Self {
            path,
            old_path: None,
            kind,
            is_dir,
            timestamp,
        }
    }

    /// Paths this event touches, newest first
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.path.as_path()).chain(self.old_path.as_deref())
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = if self.is_dir { "DIRECTORY" } else { "FILE" };
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        write!(f, "{} {:?} {} ", entry, name, self.kind)?;
        match &self.old_path {
            Some(old) => write!(f, "[{} -> {}]", old.display(), self.path.display()),
            None => write!(f, "[{}]", self.path.display()),
        }
    }
}
