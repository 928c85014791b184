//! Daemon configuration
//!
//! Settings come from an optional TOML file, then command-line flags on top.
//! Every key has a default, so an empty file (or no file) is a valid config.
//!
//! ```toml
//! [watch]
//! pattern = '^.*\.(java)$'
//! poll_interval_ms = 100
//! max_events = 1
//! recursive = true
//! match_full_path = false
//!
//! [sync]
//! source = "/home/me/project/src"
//! target = "/mnt/share/src"
//! initial_sync = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use watcher::{FilterError, PathMatcher, WatchTarget};

/// Pattern used when none is configured
pub const DEFAULT_PATTERN: &str = r"^.*\.(java)$";

const POLL_INTERVAL_RANGE: (u64, u64) = (10, 60_000);
const MAX_EVENTS_RANGE: (u64, u64) = (0, 10_000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{key} = {value} is out of range ({min}-{max})")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub watch: WatchConfig,
    pub sync: SyncSection,
}

/// `[watch]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Inclusion regex for leaf files
    pub pattern: String,
    pub poll_interval_ms: u64,
    /// Events per tick, 0 for no cap
    pub max_events: usize,
    pub recursive: bool,
    /// Try the pattern against the whole path as well as the file name
    pub match_full_path: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            poll_interval_ms: 100,
            max_events: 1,
            recursive: true,
            match_full_path: false,
        }
    }
}

/// `[sync]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Skip the source prompt when set
    pub source: Option<PathBuf>,
    /// Skip the target prompt when set
    pub target: Option<PathBuf>,
    /// Copy once at startup before waiting for changes
    pub initial_sync: bool,
}

/// Values given on the command line; `None`/`false` leaves the config alone
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub pattern: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_events: Option<usize>,
    pub no_recursive: bool,
    pub match_full_path: bool,
    pub initial_sync: bool,
}

/// Load a config file
pub fn load(path: &Path) -> Result<SyncConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl SyncConfig {
    /// Layer command-line values over file values
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(source) = &overrides.source {
            self.sync.source = Some(source.clone());
        }
        if let Some(target) = &overrides.target {
            self.sync.target = Some(target.clone());
        }
        if let Some(pattern) = &overrides.pattern {
            self.watch.pattern = pattern.clone();
        }
        if let Some(interval) = overrides.poll_interval_ms {
            self.watch.poll_interval_ms = interval;
        }
        if let Some(max_events) = overrides.max_events {
            self.watch.max_events = max_events;
        }
        if overrides.no_recursive {
            self.watch.recursive = false;
        }
        if overrides.match_full_path {
            self.watch.match_full_path = true;
        }
        if overrides.initial_sync {
            self.sync.initial_sync = true;
        }
    }

    /// Check ranges and compile the pattern
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("poll_interval_ms", self.watch.poll_interval_ms, POLL_INTERVAL_RANGE)?;
        check_range("max_events", self.watch.max_events as u64, MAX_EVENTS_RANGE)?;
        self.matcher()?;
        Ok(())
    }

    pub fn matcher(&self) -> Result<PathMatcher, ConfigError> {
        Ok(PathMatcher::new(&self.watch.pattern)?.match_full_path(self.watch.match_full_path))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_interval_ms)
    }

    /// Build the watch target for `source`
    pub fn watch_target(&self, source: &Path) -> Result<WatchTarget, ConfigError> {
        Ok(WatchTarget::new(source, self.matcher()?)
            .recursive(self.watch.recursive)
            .with_poll_interval(self.poll_interval())
            .with_max_events(self.watch.max_events))
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn check_range(key: &'static str, value: u64, (min, max): (u64, u64)) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key,
            value,
            min,
            max,
        });
    }
    Ok(())
}
