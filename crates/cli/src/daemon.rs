//! Sync daemon: watcher-driven full-tree copies
//!
//! The controller owns one [`ChangeWatcher`] and one [`RecursiveCopier`]. Every
//! notification triggers a full copy of the source tree into the target, and
//! the next notification is only picked up once that copy returns. Changes
//! that arrive meanwhile coalesce in the watcher's single-slot mailbox.

use std::fmt;
use std::path::{Path, PathBuf};
use syncr_core::{check_directory, check_disjoint, CopyError, CopyReport, PathError, RecursiveCopier};
use thiserror::Error;
use tracing::{error, info, warn};
use watcher::{ChangeWatcher, WatchError, WatchHandle, WatchTarget};

/// Which of the two roots a configuration error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Source,
    Target,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Source => f.write_str("source"),
            Role::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid {role} directory: {source}")]
    InvalidConfiguration {
        role: Role,
        #[source]
        source: PathError,
    },

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error("copy task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Running totals over the lifetime of a controller
#[derive(Debug, Default)]
pub struct SyncSummary {
    /// Copy passes attempted
    pub passes: usize,
    /// Passes that could not start (source or target unavailable)
    pub failed_passes: usize,
    /// Files written across all passes
    pub files_copied: usize,
    /// Per-entry failures across all passes
    pub errors: usize,
    /// Report of the most recent successful pass
    pub last_report: Option<CopyReport>,
}

/// Watches a source tree and mirrors it into a target on every change
pub struct SyncController {
    watcher: ChangeWatcher,
    source: PathBuf,
    target: PathBuf,
    copier: RecursiveCopier,
    initial_sync: bool,
}

impl SyncController {
    /// Validate both roots and build an idle controller
    pub fn new(watch: WatchTarget, target: impl Into<PathBuf>) -> Result<Self, ControllerError> {
        let target = target.into();

        check_directory(&watch.root).map_err(|source| ControllerError::InvalidConfiguration {
            role: Role::Source,
            source,
        })?;
        check_directory(&target)
            .and_then(|()| check_disjoint(&watch.root, &target))
            .map_err(|source| ControllerError::InvalidConfiguration {
                role: Role::Target,
                source,
            })?;

        Ok(Self {
            source: watch.root.clone(),
            watcher: ChangeWatcher::new(watch),
            target,
            copier: RecursiveCopier::new(),
            initial_sync: false,
        })
    }

    /// Replace the default copier
    pub fn with_copier(mut self, copier: RecursiveCopier) -> Self {
        self.copier = copier;
        self
    }

    /// Run one pass before waiting for the first change
    pub fn with_initial_sync(mut self, enabled: bool) -> Self {
        self.initial_sync = enabled;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Handle for closing the watch from another task
    pub fn handle(&self) -> WatchHandle {
        self.watcher.handle()
    }

    /// Copy the source tree into the target once
    pub async fn sync_once(&self) -> Result<CopyReport, ControllerError> {
        let copier = self.copier.clone();
        let source = self.source.clone();
        let target = self.target.clone();

        let report = tokio::task::spawn_blocking(move || copier.copy(&source, &target)).await??;

        if report.is_clean() {
            info!(
                "Synced {} files ({} bytes) to {}",
                report.files_copied,
                report.bytes_copied,
                self.target.display()
            );
        } else {
            warn!(
                "Synced {} files to {} with {} errors",
                report.files_copied,
                self.target.display(),
                report.errors.len()
            );
        }

        Ok(report)
    }

    /// Start the watcher and copy on every notification until it closes
    ///
    /// Returns the summary once the watch is closed through a
    /// [`WatchHandle`]. A watcher-fatal error (root removed, attach failure)
    /// ends the loop with `Err`. Copy problems never do.
    pub async fn run(&self) -> Result<SyncSummary, ControllerError> {
        self.watcher.start().await?;

        let mut summary = SyncSummary::default();
        if self.initial_sync {
            self.pass(&mut summary).await?;
        }

        loop {
            match self.watcher.recv().await {
                Ok(Some(event)) => {
                    info!("{}", event);
                    self.pass(&mut summary).await?;
                }
                Ok(None) => break,
                Err(err) => {
                    error!("Watching {} failed: {}", self.source.display(), err);
                    return Err(err.into());
                }
            }
        }

        info!(
            "Sync stopped after {} passes ({} files, {} errors)",
            summary.passes, summary.files_copied, summary.errors
        );
        Ok(summary)
    }

    async fn pass(&self, summary: &mut SyncSummary) -> Result<(), ControllerError> {
        summary.passes += 1;

        match self.sync_once().await {
            Ok(report) => {
                summary.files_copied += report.files_copied;
                summary.errors += report.errors.len();
                summary.last_report = Some(report);
                Ok(())
            }
            Err(ControllerError::Copy(err)) => {
                warn!("Sync pass skipped: {}", err);
                summary.failed_passes += 1;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
