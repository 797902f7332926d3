//! Match controller: turns clicks, a background engine search and a game
//! clock into one consistent game state.
//!
//! [`MatchState`] is the synchronous state machine. [`spawn_match`] runs it
//! inside an actor task and returns a [`MatchHandle`] for presentations.

mod actor;
pub mod clock;
pub mod commands;
pub mod events;
pub mod handle;
pub mod setup;
pub mod snapshot;
pub mod state;

pub use clock::{format_clock, Clock};
pub use commands::{InputReply, MatchError};
pub use events::MatchEvent;
pub use handle::MatchHandle;
pub use setup::{MatchSetup, Opponent, BLITZ_3, BLITZ_5, DEFAULT_ELO, MAX_ELO, MIN_ELO};
pub use snapshot::{ClockSnapshot, MatchSnapshot, MoveView, TurnView};
pub use state::{
    EngineQuery, GameOutcome, InputOutcome, MatchState, ReplyOutcome, Selection, TurnState,
};

use engine::EngineOpponent;
use tokio::sync::{broadcast, mpsc};

/// Start a match actor on the current tokio runtime.
///
/// `engine` is required when the setup has an engine opponent; it is
/// configured for the requested strength before the first query and shut
/// down when the match ends.
pub fn spawn_match(
    setup: MatchSetup,
    engine: Option<Box<dyn EngineOpponent>>,
) -> Result<MatchHandle, MatchError> {
    if setup.engine_side().is_some() && engine.is_none() {
        return Err(MatchError::EngineRequired);
    }

    let mut state = MatchState::new(setup)?;
    state.set_engine_name(engine.as_ref().and_then(|e| e.name()).map(str::to_string));
    let id = state.match_id().to_string();

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, _) = broadcast::channel(100);
    tokio::spawn(actor::run_match_actor(state, engine, cmd_rx, event_tx));

    tracing::info!(id = %id, "Match spawned");
    Ok(MatchHandle::new(id, cmd_tx))
}
