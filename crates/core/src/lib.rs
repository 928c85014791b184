//! Syncr Core - filesystem primitives for the sync daemon
//!
//! This crate provides:
//! - Root directory validation
//! - Best-effort recursive tree copy with per-entry failure reporting

pub mod copy;
pub mod paths;

// Re-export main types for convenience
pub use copy::{CopyError, CopyFailure, CopyReport, RecursiveCopier};
pub use paths::{check_directory, check_disjoint, PathError};
