use cozy_chess::{Piece, Square};
use tokio::sync::{broadcast, oneshot};

use super::events::MatchEvent;
use super::snapshot::MatchSnapshot;
use super::state::InputOutcome;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("Engine opponent configured but no engine supplied")]
    EngineRequired,
    #[error("Match is closed")]
    Closed,
}

/// Reply to a board input: what happened, and the state afterwards.
pub type InputReply = (InputOutcome, MatchSnapshot);

/// Commands sent to the match actor. Each embeds a oneshot for the reply.
/// Engine queries are never requested; the actor dispatches them itself.
pub enum MatchCommand {
    Click {
        square: Square,
        reply: oneshot::Sender<InputReply>,
    },
    PickPromotion {
        piece: Piece,
        reply: oneshot::Sender<InputReply>,
    },
    Cancel {
        reply: oneshot::Sender<InputReply>,
    },
    Reset {
        reply: oneshot::Sender<MatchSnapshot>,
    },
    GetSnapshot {
        reply: oneshot::Sender<MatchSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(MatchSnapshot, broadcast::Receiver<MatchEvent>)>,
    },
    Shutdown,
}
