use cozy_chess::{Board, Color, Move, Piece, Square};

use crate::fen::{format_fen, parse_fen, FenError};
use crate::notation;
use crate::uci::{format_uci_move, parse_uci_move, to_cozy_castling, to_standard_castling};

/// A game in progress: the current position plus the append-only list of
/// moves that produced it.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<MoveRecord>,
}

/// One applied move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// Move as the rules engine encodes it (castling is king-takes-rook).
    pub mv: Move,
    /// Coordinate token with standard castling, e.g. `e1g1`.
    pub uci: String,
    pub san: String,
    pub piece: Piece,
    pub color: Color,
    pub promotion: Option<Piece>,
    /// The move left the opponent in check.
    pub gives_check: bool,
}

impl MoveRecord {
    /// Origin and destination as shown on the board (standard castling).
    pub fn squares(&self) -> (Square, Square) {
        match parse_uci_move(&self.uci) {
            Ok(mv) => (mv.from, mv.to),
            Err(_) => (self.mv.from, self.mv.to),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Ongoing,
    Check,
    Checkmate,
    Stalemate,
}

impl PositionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Checkmate | Self::Stalemate)
    }
}

impl Game {
    pub fn new() -> Self {
        Self {
            position: Board::default(),
            history: Vec::new(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = parse_fen(fen)?;
        Ok(Self {
            position,
            history: Vec::new(),
        })
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.history.last()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn to_fen(&self) -> String {
        format_fen(&self.position)
    }

    pub fn in_check(&self) -> bool {
        !self.position.checkers().is_empty()
    }

    pub fn king_square(&self, color: Color) -> Square {
        self.position.king(color)
    }

    /// Status of the current position. The fifty-move rule and repetition
    /// are not adjudicated.
    pub fn status(&self) -> PositionStatus {
        let has_moves = self.position.generate_moves(|_| true);
        match (has_moves, self.in_check()) {
            (false, true) => PositionStatus::Checkmate,
            (false, false) => PositionStatus::Stalemate,
            (true, true) => PositionStatus::Check,
            (true, false) => PositionStatus::Ongoing,
        }
    }

    /// Decode a coordinate token against the current position.
    pub fn decode(&self, token: &str) -> Result<Move, GameError> {
        decode_move(&self.position, token)
    }

    /// Apply a legal move and record it.
    pub fn apply(&mut self, mv: Move) -> Result<&MoveRecord, GameError> {
        if !self.position.is_legal(mv) {
            return Err(GameError::IllegalMove(format_uci_move(mv)));
        }

        let before = &self.position;
        let piece = before
            .piece_on(mv.from)
            .ok_or_else(|| GameError::IllegalMove(format_uci_move(mv)))?;
        let color = before.side_to_move();
        let standard = to_standard_castling(before, mv);
        let san = notation::san(before, mv);

        let mut after = before.clone();
        after
            .try_play(mv)
            .map_err(|_| GameError::IllegalMove(format_uci_move(mv)))?;

        let record = MoveRecord {
            mv,
            uci: format_uci_move(standard),
            san,
            piece,
            color,
            promotion: mv.promotion,
            gives_check: !after.checkers().is_empty(),
        };
        self.position = after;
        self.history.push(record);

        Ok(&self.history[self.history.len() - 1])
    }
}

/// Decode a coordinate token (`e2e4`, `e7e8q`, `e1g1`) into a legal move for
/// `board`, converting standard castling to the rules engine's encoding.
pub fn decode_move(board: &Board, token: &str) -> Result<Move, GameError> {
    let token = token.trim();
    let parsed = parse_uci_move(token).map_err(|_| GameError::Undecodable(token.to_string()))?;

    let mut legal = Vec::new();
    board.generate_moves(|mvs| {
        legal.extend(mvs);
        false
    });

    let mv = to_cozy_castling(parsed, &legal);
    if legal.contains(&mv) {
        Ok(mv)
    } else {
        Err(GameError::IllegalMove(token.to_string()))
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Cannot decode move token: {0}")]
    Undecodable(String),
    #[error("FEN parse error: {0}")]
    Fen(#[from] FenError),
}
