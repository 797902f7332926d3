pub mod parser;

pub use parser::{parse_uci_message, Score, SearchInfo, UciMessage};

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),
    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
}

/// Failure to bring an engine up to the ready state.
#[derive(Debug, thiserror::Error)]
pub enum EngineStartError {
    #[error("Failed to spawn engine {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No UCI engine found")]
    NotFound,
    #[error("Engine has no stdin")]
    NoStdin,
    #[error("Engine has no stdout")]
    NoStdout,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine closed before sending {0}")]
    Closed(&'static str),
    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),
}

/// Failure during a running session (strength setup or search).
#[derive(Debug, thiserror::Error)]
pub enum EngineProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine closed its output")]
    Closed,
    #[error("No bestmove within {0:?}")]
    Timeout(Duration),
    #[error("Engine reported no legal move")]
    NoMove,
    #[error("Malformed engine reply: {0}")]
    Malformed(String),
    #[error("Engine has been shut down")]
    ShutDown,
}
