use serde::Serialize;

use crate::state::TurnState;

/// Complete, immutable snapshot of match state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSnapshot {
    pub match_id: String,
    /// Increments on every reset.
    pub epoch: u64,
    pub fen: String,
    pub side_to_move: String,
    pub turn: TurnView,
    pub selected: Option<String>,
    pub legal_targets: Vec<String>,
    pub pending_promotion: Option<(String, String)>,
    pub in_check: bool,
    /// King to highlight; absent once the game is over.
    pub checked_king: Option<String>,
    pub move_count: usize,
    pub history: Vec<MoveView>,
    pub last_move: Option<(String, String)>,
    pub clock: Option<ClockSnapshot>,
    pub outcome: Option<String>,
    pub engine_name: Option<String>,
    pub engine_thinking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnView {
    AwaitingInput,
    PendingPromotion,
    EngineThinking,
    GameOver,
}

impl From<&TurnState> for TurnView {
    fn from(turn: &TurnState) -> Self {
        match turn {
            TurnState::AwaitingInput { .. } => Self::AwaitingInput,
            TurnState::PendingPromotion { .. } => Self::PendingPromotion,
            TurnState::EngineThinking { .. } => Self::EngineThinking,
            TurnState::GameOver(_) => Self::GameOver,
        }
    }
}

/// A single move in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveView {
    pub ply: usize,
    pub uci: String,
    pub san: String,
    pub color: String,
}

/// Clock state for the client to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockSnapshot {
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
    /// "white", "black", or None when stopped
    pub running: Option<String>,
    /// Sides whose time has run out, White first.
    pub flag_fallen: Vec<String>,
}
