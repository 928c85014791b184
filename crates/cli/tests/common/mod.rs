//! Common utilities for integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use watcher::{PathMatcher, WatchTarget};

/// Poll interval used by every integration test
pub const TICK: Duration = Duration::from_millis(20);

/// Upper bound for anything expected to happen
pub const PATIENCE: Duration = Duration::from_secs(5);

/// A source and a target directory under one temp dir
pub struct SyncPair {
    _temp_dir: TempDir,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl SyncPair {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src");
        let target = temp_dir.path().join("dst");
        fs::create_dir(&source).unwrap();
        fs::create_dir(&target).unwrap();

        Self {
            _temp_dir: temp_dir,
            source,
            target,
        }
    }

    /// Watch target for `*.java` with the fast test interval
    pub fn java_watch(&self) -> WatchTarget {
        WatchTarget::new(&self.source, PathMatcher::from_extensions(&["java"]).unwrap())
            .with_poll_interval(TICK)
    }
}

/// Write `contents` to `path` so a poll tick never sees a half-written file
///
/// The data goes to a sibling `.part` file first and is renamed into place.
pub fn write_atomically(path: &Path, contents: &[u8]) {
    let staging = path.with_extension("part");
    fs::write(&staging, contents).unwrap();
    fs::rename(&staging, path).unwrap();
}

/// Wait until `condition` holds, or give up after [`PATIENCE`]
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + PATIENCE;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
