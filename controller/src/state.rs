use std::time::{Duration, Instant};

use chess::resolver::{is_promotion, legal_targets, resolve};
use chess::{format_square, Game, PieceColor, PositionStatus, PROMOTION_PIECES};
use cozy_chess::{BitBoard, Color, Move, Piece, Square};
use engine::EngineProtocolError;
use uuid::Uuid;

use crate::clock::Clock;
use crate::commands::MatchError;
use crate::setup::MatchSetup;
use crate::snapshot::{ClockSnapshot, MatchSnapshot, MoveView, TurnView};

/// Whose input the match is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    /// A human (or the engine, before dispatch) is to move.
    AwaitingInput { selection: Option<Selection> },
    /// A pawn move to the last rank is waiting for a piece choice.
    PendingPromotion { from: Square, to: Square },
    /// A query for this epoch is running.
    EngineThinking { epoch: u64 },
    GameOver(GameOutcome),
}

/// A selected origin square and where it can go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub from: Square,
    pub targets: BitBoard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Checkmate { winner: Color },
    Stalemate,
    TimeForfeit { winner: Color },
    EngineForfeit { winner: Color },
}

impl GameOutcome {
    pub fn describe(&self) -> String {
        match self {
            Self::Checkmate { winner } => format!("{} wins by checkmate", title(*winner)),
            Self::Stalemate => "Draw by stalemate".to_string(),
            Self::TimeForfeit { winner } => format!("{} wins on time", title(*winner)),
            Self::EngineForfeit { winner } => {
                format!("{} wins, engine failed to move", title(*winner))
            }
        }
    }
}

fn title(color: Color) -> &'static str {
    PieceColor::from(color).title()
}

/// Result of one human input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Ignored,
    Selected,
    Deselected,
    PromotionPending,
    Moved,
    Cancelled,
}

/// Everything a background search needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineQuery {
    pub epoch: u64,
    pub fen: String,
    pub think_time: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Applied,
    /// The reply belonged to an earlier epoch or an abandoned turn.
    Stale,
    Failed { reason: String, retrying: bool },
}

/// Synchronous match state machine. The actor owns one and drives it from
/// commands, engine replies and clock ticks.
#[derive(Debug)]
pub struct MatchState {
    match_id: Uuid,
    setup: MatchSetup,
    initial: Game,
    game: Game,
    turn: TurnState,
    clock: Clock,
    epoch: u64,
    query_in_flight: Option<u64>,
    engine_failures: u32,
    engine_name: Option<String>,
    /// Flags already reported, indexed by colour.
    flags_reported: [bool; Color::NUM],
}

impl MatchState {
    pub fn new(setup: MatchSetup) -> Result<Self, MatchError> {
        let initial = match &setup.start_fen {
            Some(fen) => Game::from_fen(fen).map_err(|e| MatchError::InvalidFen(e.to_string()))?,
            None => Game::new(),
        };

        let mut state = Self {
            match_id: Uuid::new_v4(),
            clock: fresh_clock(&setup),
            setup,
            game: initial.clone(),
            initial,
            turn: TurnState::AwaitingInput { selection: None },
            epoch: 0,
            query_in_flight: None,
            engine_failures: 0,
            engine_name: None,
            flags_reported: [false; Color::NUM],
        };
        state.settle();
        Ok(state)
    }

    pub fn match_id(&self) -> Uuid {
        self.match_id
    }

    pub fn setup(&self) -> &MatchSetup {
        &self.setup
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn query_in_flight(&self) -> bool {
        self.query_in_flight.is_some()
    }

    pub fn set_engine_name(&mut self, name: Option<String>) {
        self.engine_name = name;
    }

    pub fn is_over(&self) -> bool {
        matches!(self.turn, TurnState::GameOver(_))
    }

    /// Handle a click on `square`.
    pub fn click(&mut self, square: Square) -> InputOutcome {
        let side = self.game.side_to_move();
        if self.setup.is_engine_turn(side) {
            return InputOutcome::Ignored;
        }
        let TurnState::AwaitingInput { selection } = self.turn else {
            return InputOutcome::Ignored;
        };

        let board = self.game.position();
        if board.color_on(square) == Some(side) {
            let targets = legal_targets(board, square);
            self.turn = TurnState::AwaitingInput {
                selection: Some(Selection {
                    from: square,
                    targets,
                }),
            };
            return InputOutcome::Selected;
        }

        let Some(selection) = selection else {
            return InputOutcome::Ignored;
        };

        if !selection.targets.has(square) {
            self.clear_selection();
            return InputOutcome::Deselected;
        }

        if is_promotion(board, selection.from, square) {
            self.turn = TurnState::PendingPromotion {
                from: selection.from,
                to: square,
            };
            self.clock.freeze();
            return InputOutcome::PromotionPending;
        }

        match resolve(board, selection.from, square, None) {
            Some(mv) => self.apply_move(mv),
            None => {
                self.clear_selection();
                InputOutcome::Deselected
            }
        }
    }

    /// Complete a pending promotion with `piece`.
    pub fn pick_promotion(&mut self, piece: Piece) -> InputOutcome {
        let TurnState::PendingPromotion { from, to } = self.turn else {
            return InputOutcome::Ignored;
        };
        if !PROMOTION_PIECES.contains(&piece) {
            return InputOutcome::Ignored;
        }

        match resolve(self.game.position(), from, to, Some(piece)) {
            Some(mv) => self.apply_move(mv),
            None => {
                self.clear_selection();
                InputOutcome::Deselected
            }
        }
    }

    /// Abandon a pending promotion or selection. No move is made.
    pub fn cancel(&mut self) -> InputOutcome {
        match self.turn {
            TurnState::PendingPromotion { .. } => {
                self.clear_selection();
                InputOutcome::Cancelled
            }
            TurnState::AwaitingInput {
                selection: Some(_),
            } => {
                self.clear_selection();
                InputOutcome::Deselected
            }
            _ => InputOutcome::Ignored,
        }
    }

    /// Start over from the configured position.
    ///
    /// An outstanding engine query stays outstanding; its reply will carry
    /// the old epoch and be discarded.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.game = self.initial.clone();
        self.clock = fresh_clock(&self.setup);
        self.engine_failures = 0;
        self.flags_reported = [false; Color::NUM];
        self.turn = TurnState::AwaitingInput { selection: None };
        self.settle();
        tracing::info!(epoch = self.epoch, "Match reset");
    }

    /// True while the clock should be ticked.
    pub fn clock_running(&self) -> bool {
        self.clock.is_running() && self.is_clocked_turn()
    }

    /// Advance the clock to `now`. Returns true when the tick changed
    /// something a presentation should redraw (a flag fell).
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_clocked_turn() {
            self.clock.freeze();
            return false;
        }

        let side = self.game.side_to_move();
        self.clock.tick(side, now);
        if !self.clock.is_flag_fallen(side) || self.flags_reported[side as usize] {
            return false;
        }

        self.flags_reported[side as usize] = true;
        if self.setup.time_forfeit {
            let outcome = GameOutcome::TimeForfeit { winner: !side };
            tracing::info!("{}", outcome.describe());
            self.turn = TurnState::GameOver(outcome);
            self.clock.pause();
        } else {
            tracing::info!(side = ?side, "Flag fell");
        }
        true
    }

    /// Claim the engine for the current position if it is the engine's turn
    /// and no query is outstanding.
    pub fn begin_engine_query(&mut self) -> Option<EngineQuery> {
        if self.query_in_flight.is_some() {
            return None;
        }
        if !matches!(self.turn, TurnState::AwaitingInput { .. }) {
            return None;
        }
        if !self.setup.is_engine_turn(self.game.side_to_move()) {
            return None;
        }
        let think_time = self.setup.think_time()?;

        self.query_in_flight = Some(self.epoch);
        self.turn = TurnState::EngineThinking { epoch: self.epoch };
        Some(EngineQuery {
            epoch: self.epoch,
            fen: self.game.to_fen(),
            think_time,
        })
    }

    /// Hand a finished search back to the match.
    pub fn absorb_engine_reply(
        &mut self,
        epoch: u64,
        result: Result<String, EngineProtocolError>,
    ) -> ReplyOutcome {
        self.query_in_flight = None;

        if epoch != self.epoch || self.turn != (TurnState::EngineThinking { epoch }) {
            tracing::debug!(reply_epoch = epoch, epoch = self.epoch, "Discarding stale engine reply");
            return ReplyOutcome::Stale;
        }

        let failure = match result {
            Ok(token) => match self.game.decode(&token) {
                Ok(mv) => {
                    self.engine_failures = 0;
                    self.apply_move(mv);
                    return ReplyOutcome::Applied;
                }
                Err(e) => format!("Engine move {} rejected: {}", token, e),
            },
            Err(e) => format!("Engine query failed: {}", e),
        };

        self.engine_failures += 1;
        if self.engine_failures > self.setup.max_engine_retries {
            let winner = !self.game.side_to_move();
            let outcome = GameOutcome::EngineForfeit { winner };
            tracing::error!(failures = self.engine_failures, "{}; {}", failure, outcome.describe());
            self.turn = TurnState::GameOver(outcome);
            self.clock.pause();
            ReplyOutcome::Failed {
                reason: failure,
                retrying: false,
            }
        } else {
            tracing::warn!(failures = self.engine_failures, "{}; retrying", failure);
            self.turn = TurnState::AwaitingInput { selection: None };
            ReplyOutcome::Failed {
                reason: failure,
                retrying: true,
            }
        }
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        let (selected, targets) = match &self.turn {
            TurnState::AwaitingInput {
                selection: Some(selection),
            } => (Some(selection.from), selection.targets),
            _ => (None, BitBoard::EMPTY),
        };
        let pending_promotion = match self.turn {
            TurnState::PendingPromotion { from, to } => {
                Some((format_square(from), format_square(to)))
            }
            _ => None,
        };
        let outcome = match &self.turn {
            TurnState::GameOver(outcome) => Some(outcome.describe()),
            _ => None,
        };

        let side = self.game.side_to_move();
        let in_check = self.game.in_check();
        let checked_king = self
            .game
            .last_move()
            .filter(|record| record.gives_check && !self.is_over())
            .map(|_| format_square(self.game.king_square(side)));

        let history = self
            .game
            .history()
            .iter()
            .enumerate()
            .map(|(i, record)| MoveView {
                ply: i + 1,
                uci: record.uci.clone(),
                san: record.san.clone(),
                color: PieceColor::from(record.color).as_str().to_string(),
            })
            .collect();
        let last_move = self.game.last_move().map(|record| {
            let (from, to) = record.squares();
            (format_square(from), format_square(to))
        });

        let clock = self.clock.is_enabled().then(|| ClockSnapshot {
            white_remaining_ms: self.clock.remaining(Color::White).as_millis() as u64,
            black_remaining_ms: self.clock.remaining(Color::Black).as_millis() as u64,
            running: self
                .clock_running()
                .then(|| PieceColor::from(side).as_str().to_string()),
            flag_fallen: Color::ALL
                .into_iter()
                .filter(|&c| self.flags_reported[c as usize])
                .map(|c| PieceColor::from(c).as_str().to_string())
                .collect(),
        });

        MatchSnapshot {
            match_id: self.match_id.to_string(),
            epoch: self.epoch,
            fen: self.game.to_fen(),
            side_to_move: PieceColor::from(side).as_str().to_string(),
            turn: TurnView::from(&self.turn),
            selected: selected.map(format_square),
            legal_targets: targets.into_iter().map(format_square).collect(),
            pending_promotion,
            in_check,
            checked_king,
            move_count: self.game.history().len(),
            history,
            last_move,
            clock,
            outcome,
            engine_name: self.engine_name.clone(),
            engine_thinking: matches!(self.turn, TurnState::EngineThinking { .. }),
        }
    }

    fn apply_move(&mut self, mv: Move) -> InputOutcome {
        let (uci, san) = match self.game.apply(mv) {
            Ok(record) => (record.uci.clone(), record.san.clone()),
            Err(e) => {
                tracing::warn!("Rejected move: {}", e);
                self.clear_selection();
                return InputOutcome::Deselected;
            }
        };
        tracing::info!(ply = self.game.history().len(), "{} {}", uci, san);
        self.settle();
        InputOutcome::Moved
    }

    /// Enter game over if the position is terminal, otherwise wait for the
    /// side to move.
    fn settle(&mut self) {
        let outcome = match self.game.status() {
            PositionStatus::Checkmate => Some(GameOutcome::Checkmate {
                winner: !self.game.side_to_move(),
            }),
            PositionStatus::Stalemate => Some(GameOutcome::Stalemate),
            PositionStatus::Ongoing | PositionStatus::Check => None,
        };

        match outcome {
            Some(outcome) => {
                tracing::info!("{}", outcome.describe());
                self.turn = TurnState::GameOver(outcome);
                self.clock.pause();
            }
            None => self.turn = TurnState::AwaitingInput { selection: None },
        }
    }

    fn clear_selection(&mut self) {
        self.turn = TurnState::AwaitingInput { selection: None };
    }

    fn is_clocked_turn(&self) -> bool {
        matches!(
            self.turn,
            TurnState::AwaitingInput { .. } | TurnState::EngineThinking { .. }
        )
    }
}

fn fresh_clock(setup: &MatchSetup) -> Clock {
    match setup.clock {
        Some(initial) => Clock::start(initial, true),
        None => Clock::disabled(),
    }
}
