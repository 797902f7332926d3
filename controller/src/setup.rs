//! Match configuration chosen before play starts.

use std::time::Duration;

use cozy_chess::Color;

pub const MIN_ELO: u32 = 800;
pub const MAX_ELO: u32 = 2000;
pub const DEFAULT_ELO: u32 = 1200;
pub const DEFAULT_THINK_TIME: Duration = Duration::from_millis(300);
pub const DEFAULT_MAX_ENGINE_RETRIES: u32 = 2;

/// Three-minute clock preset.
pub const BLITZ_3: Duration = Duration::from_secs(180);
/// Five-minute clock preset.
pub const BLITZ_5: Duration = Duration::from_secs(300);

/// Who sits across the board from the local player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opponent {
    /// Two players sharing one board.
    Local,
    /// A UCI engine playing `side`.
    Engine {
        side: Color,
        elo: u32,
        think_time: Duration,
    },
}

impl Default for Opponent {
    fn default() -> Self {
        Self::Engine {
            side: Color::Black,
            elo: DEFAULT_ELO,
            think_time: DEFAULT_THINK_TIME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSetup {
    pub opponent: Opponent,
    /// Initial time per side; `None` plays without a clock.
    pub clock: Option<Duration>,
    /// End the game when the side to move runs out of time.
    pub time_forfeit: bool,
    /// Start position; `None` is the standard position.
    pub start_fen: Option<String>,
    /// Consecutive engine failures tolerated before the engine forfeits.
    pub max_engine_retries: u32,
}

impl Default for MatchSetup {
    fn default() -> Self {
        Self {
            opponent: Opponent::default(),
            clock: None,
            time_forfeit: false,
            start_fen: None,
            max_engine_retries: DEFAULT_MAX_ENGINE_RETRIES,
        }
    }
}

impl MatchSetup {
    pub fn local() -> Self {
        Self {
            opponent: Opponent::Local,
            ..Self::default()
        }
    }

    pub fn engine_side(&self) -> Option<Color> {
        match self.opponent {
            Opponent::Engine { side, .. } => Some(side),
            Opponent::Local => None,
        }
    }

    /// Requested engine strength, clamped to the supported range.
    pub fn elo(&self) -> Option<u32> {
        match self.opponent {
            Opponent::Engine { elo, .. } => Some(elo.clamp(MIN_ELO, MAX_ELO)),
            Opponent::Local => None,
        }
    }

    pub fn think_time(&self) -> Option<Duration> {
        match self.opponent {
            Opponent::Engine { think_time, .. } => Some(think_time),
            Opponent::Local => None,
        }
    }

    pub fn is_engine_turn(&self, side_to_move: Color) -> bool {
        self.engine_side() == Some(side_to_move)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let setup = MatchSetup::default();
        assert_eq!(setup.engine_side(), Some(Color::Black));
        assert_eq!(setup.elo(), Some(1200));
        assert_eq!(setup.think_time(), Some(Duration::from_millis(300)));
        assert_eq!(setup.clock, None);
        assert!(!setup.time_forfeit);
    }

    #[test]
    fn test_elo_is_clamped() {
        let mut setup = MatchSetup::default();
        setup.opponent = Opponent::Engine {
            side: Color::White,
            elo: 3000,
            think_time: DEFAULT_THINK_TIME,
        };
        assert_eq!(setup.elo(), Some(MAX_ELO));
        assert!(setup.is_engine_turn(Color::White));
        assert!(!setup.is_engine_turn(Color::Black));
    }

    #[test]
    fn test_local_has_no_engine() {
        let setup = MatchSetup::local();
        assert_eq!(setup.engine_side(), None);
        assert_eq!(setup.elo(), None);
        assert!(!setup.is_engine_turn(Color::White));
    }
}
