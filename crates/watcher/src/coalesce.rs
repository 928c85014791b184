//! Single-slot event coalescing
//!
//! The watcher and its consumer talk through a [`Mailbox`] holding at most one
//! pending event. Posting while an event is still unconsumed replaces it, so a
//! slow consumer sees the latest change once instead of replaying a backlog.
//!
//! A fatal error takes precedence over any pending event and is handed out
//! exactly once; after that the mailbox reports closed forever.

use crate::{ChangeEvent, WatchError};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Result of posting into the mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// Slot was empty
    Delivered,
    /// An unconsumed event was overwritten
    Replaced,
    /// Mailbox is closed, event discarded
    Rejected,
}

#[derive(Default)]
struct Slot {
    pending: Option<ChangeEvent>,
    fatal: Option<WatchError>,
    closed: bool,
    coalesced: u64,
}

/// Capacity-1 mailbox with overwrite-on-full semantics
///
/// Meant for exactly one consumer.
#[derive(Default)]
pub struct Mailbox {
    slot: Mutex<Slot>,
    ready: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an event in the slot, replacing any unconsumed one
    pub fn post(&self, event: ChangeEvent) -> PostOutcome {
        let outcome = {
            let mut slot = self.slot.lock();
            if slot.closed {
                return PostOutcome::Rejected;
            }
            match slot.pending.replace(event) {
                Some(_) => {
                    slot.coalesced += 1;
                    PostOutcome::Replaced
                }
                None => PostOutcome::Delivered,
            }
        };

        self.ready.notify_one();
        outcome
    }

    /// Record a fatal error and close the mailbox
    ///
    /// Any pending event is discarded. Ignored if already closed.
    pub fn fail(&self, err: WatchError) {
        {
            let mut slot = self.slot.lock();
            if slot.closed {
                return;
            }
            slot.pending = None;
            slot.fatal = Some(err);
            slot.closed = true;
        }
        self.ready.notify_one();
    }

    /// Close without an error, discarding any pending event
    pub fn close(&self) {
        {
            let mut slot = self.slot.lock();
            slot.pending = None;
            slot.closed = true;
        }
        self.ready.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    /// Number of events that were overwritten before being consumed
    pub fn coalesced(&self) -> u64 {
        self.slot.lock().coalesced
    }

    /// Take whatever is ready without waiting
    ///
    /// `Ok(None)` means the slot is empty or the mailbox is closed.
    pub fn try_recv(&self) -> Result<Option<ChangeEvent>, WatchError> {
        let mut slot = self.slot.lock();
        if let Some(err) = slot.fatal.take() {
            return Err(err);
        }
        Ok(slot.pending.take())
    }

    /// Wait for the next event
    ///
    /// Returns `Ok(None)` once the mailbox is closed and drained, and the
    /// fatal error (once) if the producer failed.
    pub async fn recv(&self) -> Result<Option<ChangeEvent>, WatchError> {
        loop {
            {
                let mut slot = self.slot.lock();
                if let Some(err) = slot.fatal.take() {
                    return Err(err);
                }
                if let Some(event) = slot.pending.take() {
                    return Ok(Some(event));
                }
                if slot.closed {
                    return Ok(None);
                }
            }

            // notify_one stores a permit, so a post between unlock and here
            // is not lost
            self.ready.notified().await;
        }
    }
}
