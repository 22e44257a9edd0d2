use std::time::Duration;

use tracing::warn;

/// Fixed window of pieces the prefetch adapter is allowed to have in flight.
///
/// Not configurable: the reference implementation hardcodes this, and so do we.
pub const PREFETCH_WINDOW: usize = 64;

/// Deadline for `Connector::create_downloader`.
pub const DOWNLOADER_DEADLINE: Duration = Duration::from_secs(10);

/// Largest remote file the facade will stream inline rather than reject.
pub const MAX_FILE_SERVE_SIZE: u64 = 50 * 1024 * 1024;

const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;
const DEFAULT_STREAM_CHANNEL_CAPACITY: usize = 6;

/// Environment-driven configuration for the bag cache and streaming engine.
///
/// Every field has a validated default, so a missing or malformed environment
/// variable degrades to that default with a logged warning rather than
/// failing startup -- this subsystem is not the process entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// `REMOTE_TON_STORAGE_CACHE_MAX_ENTRIES`, default 100, floor 1.
    pub cache_max_entries: usize,
    /// `REMOTE_TON_STORAGE_STREAM_CHANNEL_CAPACITY`, default 6, floor 1.
    pub stream_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            stream_channel_capacity: DEFAULT_STREAM_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            cache_max_entries: parse_positive_env(
                "REMOTE_TON_STORAGE_CACHE_MAX_ENTRIES",
                DEFAULT_CACHE_MAX_ENTRIES,
            ),
            stream_channel_capacity: parse_positive_env(
                "REMOTE_TON_STORAGE_STREAM_CHANNEL_CAPACITY",
                DEFAULT_STREAM_CHANNEL_CAPACITY,
            ),
        }
    }
}

fn parse_positive_env(var: &str, default: usize) -> usize {
    match std::env::var(var) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(v) if v > 0 => v as usize,
            Ok(v) => {
                warn!(var, value = v, default, "non-positive value, using default");
                default
            }
            Err(e) => {
                warn!(var, value = %raw, error = %e, default, "unparsable value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
