//! Syncr daemon library
//!
//! Everything the `syncr` binary wires together, exposed for integration
//! tests: the sync controller, configuration, prompts and the banner.

pub mod banner;
pub mod config;
pub mod daemon;
pub mod prompt;

pub use config::{ConfigError, Overrides, SyncConfig};
pub use daemon::{ControllerError, Role, SyncController, SyncSummary};
