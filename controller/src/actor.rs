use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use engine::{EngineOpponent, EngineProtocolError};
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::Instrument;

use super::commands::MatchCommand;
use super::events::MatchEvent;
use super::state::{InputOutcome, MatchState, ReplyOutcome};

/// How long shutdown waits for an in-flight search to hand the engine back.
const ENGINE_RECLAIM_TIMEOUT: Duration = Duration::from_secs(1);
const CLOCK_INTERVAL: Duration = Duration::from_millis(100);

type EngineSlot = Option<Box<dyn EngineOpponent>>;

/// A finished search, returned through the mailbox together with the engine
/// it borrowed.
pub(crate) struct EngineReply {
    epoch: u64,
    result: Result<String, EngineProtocolError>,
    engine: Box<dyn EngineOpponent>,
}

/// The main match actor loop.
/// Owns all mutable state. Processes commands, engine replies and clock
/// ticks sequentially.
pub(crate) async fn run_match_actor(
    state: MatchState,
    engine: EngineSlot,
    cmd_rx: mpsc::Receiver<MatchCommand>,
    event_tx: broadcast::Sender<MatchEvent>,
) {
    let match_id = state.match_id();
    run_match_actor_inner(state, engine, cmd_rx, event_tx)
        .instrument(tracing::info_span!("match", id = %match_id))
        .await;
}

async fn run_match_actor_inner(
    mut state: MatchState,
    mut engine: EngineSlot,
    mut cmd_rx: mpsc::Receiver<MatchCommand>,
    event_tx: broadcast::Sender<MatchEvent>,
) {
    tracing::info!("Match actor started");

    let (reply_tx, mut reply_rx) = mpsc::channel::<EngineReply>(1);

    if let (Some(engine), Some(elo)) = (engine.as_mut(), state.setup().elo()) {
        if let Err(e) = engine.configure_strength(elo).await {
            tracing::warn!("Failed to configure engine strength: {}", e);
            let _ = event_tx.send(MatchEvent::Error(format!(
                "Failed to configure engine strength: {}",
                e
            )));
        }
    }

    let mut clock_interval = time::interval(CLOCK_INTERVAL);
    clock_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    maybe_dispatch(&mut state, &mut engine, &reply_tx, &event_tx);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                tick_clock(&mut state, &event_tx);
                let Some(cmd) = cmd else {
                    tracing::info!("All match handles dropped");
                    break;
                };
                if handle_command(&mut state, cmd, &event_tx).is_break() {
                    tracing::info!("Match actor shutting down");
                    break;
                }
                tick_clock(&mut state, &event_tx);
                maybe_dispatch(&mut state, &mut engine, &reply_tx, &event_tx);
            }

            Some(reply) = reply_rx.recv() => {
                tick_clock(&mut state, &event_tx);
                handle_engine_reply(&mut state, &mut engine, reply, &event_tx);
                tick_clock(&mut state, &event_tx);
                maybe_dispatch(&mut state, &mut engine, &reply_tx, &event_tx);
            }

            _ = clock_interval.tick(), if state.clock_running() => {
                tick_clock(&mut state, &event_tx);
            }
        }
    }

    shutdown_engine(&mut state, &mut engine, &mut reply_rx).await;
    tracing::info!("Match actor exited");
}

fn handle_command(
    state: &mut MatchState,
    cmd: MatchCommand,
    event_tx: &broadcast::Sender<MatchEvent>,
) -> ControlFlow<()> {
    match cmd {
        MatchCommand::Click { square, reply } => {
            let outcome = state.click(square);
            let _ = reply.send(finish_input(state, outcome, event_tx));
        }
        MatchCommand::PickPromotion { piece, reply } => {
            let outcome = state.pick_promotion(piece);
            let _ = reply.send(finish_input(state, outcome, event_tx));
        }
        MatchCommand::Cancel { reply } => {
            let outcome = state.cancel();
            let _ = reply.send(finish_input(state, outcome, event_tx));
        }
        MatchCommand::Reset { reply } => {
            state.reset();
            let snapshot = state.snapshot();
            let _ = event_tx.send(MatchEvent::StateChanged(snapshot.clone()));
            let _ = reply.send(snapshot);
        }
        MatchCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        MatchCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        MatchCommand::Shutdown => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

fn finish_input(
    state: &MatchState,
    outcome: InputOutcome,
    event_tx: &broadcast::Sender<MatchEvent>,
) -> (InputOutcome, super::snapshot::MatchSnapshot) {
    let snapshot = state.snapshot();
    if outcome != InputOutcome::Ignored {
        let _ = event_tx.send(MatchEvent::StateChanged(snapshot.clone()));
    }
    (outcome, snapshot)
}

fn tick_clock(state: &mut MatchState, event_tx: &broadcast::Sender<MatchEvent>) {
    if state.tick(Instant::now()) {
        let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
    }
}

/// Hand the engine to a background search if the position calls for one.
fn maybe_dispatch(
    state: &mut MatchState,
    slot: &mut EngineSlot,
    reply_tx: &mpsc::Sender<EngineReply>,
    event_tx: &broadcast::Sender<MatchEvent>,
) {
    if slot.is_none() {
        return;
    }
    let Some(query) = state.begin_engine_query() else {
        return;
    };
    let Some(mut engine) = slot.take() else {
        return;
    };

    tracing::debug!(epoch = query.epoch, "Dispatching engine query");
    let reply_tx = reply_tx.clone();
    tokio::spawn(
        async move {
            let result = engine.best_move(&query.fen, query.think_time).await;
            let reply = EngineReply {
                epoch: query.epoch,
                result,
                engine,
            };
            if reply_tx.send(reply).await.is_err() {
                tracing::debug!("Match closed before engine reply was delivered");
            }
        }
        .in_current_span(),
    );

    let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
}

fn handle_engine_reply(
    state: &mut MatchState,
    slot: &mut EngineSlot,
    reply: EngineReply,
    event_tx: &broadcast::Sender<MatchEvent>,
) {
    let EngineReply {
        epoch,
        result,
        engine,
    } = reply;
    *slot = Some(engine);

    match state.absorb_engine_reply(epoch, result) {
        ReplyOutcome::Applied => {
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        }
        ReplyOutcome::Stale => {}
        ReplyOutcome::Failed { reason, retrying } => {
            let _ = event_tx.send(MatchEvent::EngineFailed { reason, retrying });
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        }
    }
}

async fn shutdown_engine(
    state: &mut MatchState,
    slot: &mut EngineSlot,
    reply_rx: &mut mpsc::Receiver<EngineReply>,
) {
    if slot.is_none() && state.query_in_flight() {
        match time::timeout(ENGINE_RECLAIM_TIMEOUT, reply_rx.recv()).await {
            Ok(Some(reply)) => *slot = Some(reply.engine),
            _ => tracing::warn!("Engine still searching at shutdown, dropping it"),
        }
    }

    if let Some(mut engine) = slot.take() {
        engine.shutdown().await;
    }
}
