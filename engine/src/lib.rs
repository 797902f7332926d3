pub mod process;
pub mod uci;

pub use process::UciEngine;
pub use uci::{
    parse_uci_message, EngineProtocolError, EngineStartError, Score, SearchInfo, UciError,
    UciMessage,
};

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

/// Default bound on each handshake marker wait (`uciok`, `readyok`).
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default slack on top of the requested think time before a search is
/// considered lost.
pub const DEFAULT_SEARCH_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTimeouts {
    pub handshake: Duration,
    pub search_grace: Duration,
}

impl Default for EngineTimeouts {
    fn default() -> Self {
        Self {
            handshake: DEFAULT_HANDSHAKE_TIMEOUT,
            search_grace: DEFAULT_SEARCH_GRACE,
        }
    }
}

/// An automated opponent the match controller can query for moves.
///
/// Implemented by [`UciEngine`]; tests substitute scripted opponents.
#[async_trait]
pub trait EngineOpponent: Send {
    /// Name the engine reported during the handshake, if any.
    fn name(&self) -> Option<&str>;

    /// Limit playing strength to roughly `elo`.
    async fn configure_strength(&mut self, elo: u32) -> Result<(), EngineProtocolError>;

    /// Search `fen` for `think_time` and return the chosen move token
    /// (`e2e4`, `e7e8q`, castling as `e1g1`).
    async fn best_move(
        &mut self,
        fen: &str,
        think_time: Duration,
    ) -> Result<String, EngineProtocolError>;

    /// Stop the engine. Calling this more than once is a no-op.
    async fn shutdown(&mut self);
}

/// Common install locations for Stockfish.
const STOCKFISH_PATHS: &[&str] = &[
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/games/stockfish",
];

/// Find an engine executable: `explicit` when given, otherwise a Stockfish
/// binary in a common location or on `PATH`.
pub fn locate_engine(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let known = STOCKFISH_PATHS.iter().map(PathBuf::from);
    let on_path = std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join("stockfish"))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    known.chain(on_path).find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/opt/engines/my-engine");
        assert_eq!(locate_engine(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn test_default_timeouts() {
        let timeouts = EngineTimeouts::default();
        assert_eq!(timeouts.handshake, Duration::from_secs(10));
        assert_eq!(timeouts.search_grace, Duration::from_secs(5));
    }
}
