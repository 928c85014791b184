//! Workflow integration tests
//!
//! Each module drives a full controller (watcher + copier) and checks what
//! lands in the target tree.

pub mod failures;
pub mod watch_and_copy;
