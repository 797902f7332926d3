//! Configuration for chessmatch runtime.
//!
//! Every value has a compile-time default and can be overridden at runtime
//! via a dedicated environment variable. Command-line flags take precedence
//! where both exist.

use std::path::PathBuf;
use std::time::Duration;

use engine::EngineTimeouts;

/// Default per-marker handshake timeout (in seconds).
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Default slack after the think time before a search is abandoned (in milliseconds).
const DEFAULT_SEARCH_GRACE_MS: u64 = 5000;

/// Default directory for rolling log files.
const DEFAULT_LOG_DIR: &str = "logs";

/// Get the engine binary path, if configured.
///
/// Priority:
/// 1. `CHESSMATCH_ENGINE_PATH` env variable if set and non-empty
/// 2. `None`, leaving discovery to the engine locator
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var("CHESSMATCH_ENGINE_PATH")
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Get the handshake timeout in seconds.
///
/// Priority:
/// 1. `CHESSMATCH_HANDSHAKE_TIMEOUT_SECS` env variable if set (falls back to
///    the default if the value cannot be parsed as a `u64`)
/// 2. `10` seconds as fallback
pub fn get_handshake_timeout_secs() -> u64 {
    if let Ok(timeout) = std::env::var("CHESSMATCH_HANDSHAKE_TIMEOUT_SECS") {
        return timeout.parse().unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS);
    }

    DEFAULT_HANDSHAKE_TIMEOUT_SECS
}

/// Get the search grace period in milliseconds.
///
/// Priority:
/// 1. `CHESSMATCH_SEARCH_GRACE_MS` env variable if set (falls back to the
///    default if unparsable)
/// 2. `5000` ms as fallback
pub fn get_search_grace_ms() -> u64 {
    if let Ok(grace) = std::env::var("CHESSMATCH_SEARCH_GRACE_MS") {
        return grace.parse().unwrap_or(DEFAULT_SEARCH_GRACE_MS);
    }

    DEFAULT_SEARCH_GRACE_MS
}

/// Get the directory rolling logs are written to.
///
/// Priority:
/// 1. `CHESSMATCH_LOG_DIR` env variable if set
/// 2. `logs` (relative to the working directory) as fallback
pub fn get_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSMATCH_LOG_DIR") {
        return PathBuf::from(dir);
    }

    PathBuf::from(DEFAULT_LOG_DIR)
}

pub fn engine_timeouts() -> EngineTimeouts {
    EngineTimeouts {
        handshake: Duration::from_secs(get_handshake_timeout_secs()),
        search_grace: Duration::from_millis(get_search_grace_ms()),
    }
}
