//! Polling change watcher
//!
//! Detects changes by snapshotting the tree on a fixed interval and diffing
//! consecutive snapshots. No OS notification API is involved, so behaviour is
//! identical on every platform.
//!
//! Lifecycle is `Idle -> Watching -> Closed`. `Closed` is terminal: a closed
//! watcher cannot be restarted, build a new one instead.

use crate::coalesce::{Mailbox, PostOutcome};
use crate::snapshot::FileSnapshot;
use crate::{ChangeEvent, WatchError, WatchTarget};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use syncr_core::check_directory;
use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Lifecycle state of a [`ChangeWatcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Closed,
}

/// State shared between the watcher, its handles and the poll task
struct Shared {
    mailbox: Mailbox,
    shutdown: Notify,
    state: Mutex<WatchState>,
}

impl Shared {
    fn close(&self) {
        *self.state.lock() = WatchState::Closed;
        self.mailbox.close();
        self.shutdown.notify_one();
    }

    fn fail(&self, err: WatchError) {
        *self.state.lock() = WatchState::Closed;
        self.mailbox.fail(err);
        self.shutdown.notify_one();
    }

    fn is_closed(&self) -> bool {
        *self.state.lock() == WatchState::Closed
    }
}

/// Cloneable handle that can close a watcher from another task
#[derive(Clone)]
pub struct WatchHandle {
    shared: Arc<Shared>,
}

impl WatchHandle {
    /// Stop the watch; pending and future events are discarded
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn state(&self) -> WatchState {
        *self.shared.state.lock()
    }
}

/// Polling file system watcher
///
/// Events are delivered through a single-slot mailbox: if the consumer is
/// still busy with the previous event, newer ones overwrite each other until
/// it calls [`recv`](Self::recv) again.
pub struct ChangeWatcher {
    target: WatchTarget,
    shared: Arc<Shared>,
}

impl ChangeWatcher {
    /// Create an idle watcher; nothing touches the filesystem until `start`
    pub fn new(target: WatchTarget) -> Self {
        Self {
            target,
            shared: Arc::new(Shared {
                mailbox: Mailbox::new(),
                shutdown: Notify::new(),
                state: Mutex::new(WatchState::Idle),
            }),
        }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    pub fn state(&self) -> WatchState {
        *self.shared.state.lock()
    }

    pub fn handle(&self) -> WatchHandle {
        WatchHandle {
            shared: self.shared.clone(),
        }
    }

    /// Events overwritten before the consumer picked them up
    pub fn coalesced(&self) -> u64 {
        self.shared.mailbox.coalesced()
    }

    /// Attach to the root and spawn the poll loop
    ///
    /// Validates the root, makes it absolute and captures the initial
    /// snapshot. Any failure here is fatal and leaves the watcher `Closed`.
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<(), WatchError> {
        match self.state() {
            WatchState::Idle => {}
            WatchState::Watching => return Err(WatchError::AlreadyWatching),
            WatchState::Closed => return Err(WatchError::Closed),
        }

        let requested = self.target.root.clone();
        let recursive = self.target.recursive;
        let attached = tokio::task::spawn_blocking(move || {
            check_directory(&requested)?;
            // Symlinks in the root stay unresolved: removing the link ends the watch
            let root = if requested.is_absolute() {
                requested
            } else {
                std::env::current_dir()
                    .map_err(|source| WatchError::Enumerate {
                        path: requested.clone(),
                        source,
                    })?
                    .join(&requested)
            };
            let snapshot = FileSnapshot::capture(&root, recursive)?;
            Ok::<_, WatchError>((root, snapshot))
        })
        .await
        .unwrap_or_else(|join_err| Err(join_err.into()));

        let (root, initial) = match attached {
            Ok(attached) => attached,
            Err(err) => {
                error!("Failed to attach watcher to {}: {}", self.target.root.display(), err);
                self.shared.close();
                return Err(err);
            }
        };

        {
            let mut state = self.shared.state.lock();
            match *state {
                WatchState::Idle => *state = WatchState::Watching,
                WatchState::Watching => return Err(WatchError::AlreadyWatching),
                WatchState::Closed => return Err(WatchError::Closed),
            }
        }

        info!(
            "Watching {} ({} entries, interval: {:?}, pattern: {})",
            root.display(),
            initial.len(),
            self.target.poll_interval,
            self.target.filter.pattern()
        );

        tokio::spawn(poll_loop(self.shared.clone(), self.target.clone(), root, initial));
        Ok(())
    }

    /// Wait for the next qualifying change
    ///
    /// `Ok(None)` once the watcher is closed. A fatal error is returned once,
    /// after which every call yields `Ok(None)`.
    pub async fn recv(&self) -> Result<Option<ChangeEvent>, WatchError> {
        if self.state() == WatchState::Idle {
            return Err(WatchError::NotStarted);
        }
        self.shared.mailbox.recv().await
    }

    /// Stop watching. Irreversible.
    pub fn close(&self) {
        self.shared.close();
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        // Otherwise the poll task would outlive its only consumer
        self.shared.close();
    }
}

/// Snapshot-and-diff loop, one iteration per tick
async fn poll_loop(
    shared: Arc<Shared>,
    target: WatchTarget,
    root: PathBuf,
    mut previous: FileSnapshot,
) {
    let mut timer = interval(target.poll_interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    timer.tick().await;

    loop {
        tokio::select! {
            _ = shared.shutdown.notified() => break,
            _ = timer.tick() => {}
        }
        if shared.is_closed() {
            break;
        }

        let capture_root = root.clone();
        let recursive = target.recursive;
        let captured = tokio::task::spawn_blocking(move || {
            FileSnapshot::capture(&capture_root, recursive)
        })
        .await
        .unwrap_or_else(|join_err| Err(join_err.into()));

        let current = match captured {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!("Watch on {} failed: {}", root.display(), err);
                shared.fail(err);
                return;
            }
        };

        let mut events: Vec<ChangeEvent> = previous
            .diff(&current, SystemTime::now())
            .into_iter()
            .filter(|event| target.filter.accepts(event))
            .collect();
        previous = current;

        if target.max_events > 0 && events.len() > target.max_events {
            debug!(
                "Tick produced {} events, keeping {}",
                events.len(),
                target.max_events
            );
            events.truncate(target.max_events);
        }

        for event in events {
            debug!("{}", event);
            if shared.mailbox.post(event) == PostOutcome::Rejected {
                break;
            }
        }
    }

    debug!("Poll loop for {} stopped", root.display());
}
