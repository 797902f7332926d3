use cozy_chess::Board;

/// Standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let fen = fen.trim();
    let fields = fen.split_whitespace().count();
    if fields == 0 {
        return Err(FenError::Empty);
    }
    if fields != 6 {
        return Err(FenError::FieldCount(fields));
    }

    fen.parse()
        .map_err(|_| FenError::InvalidPosition(fen.to_string()))
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Empty FEN string")]
    Empty,
    #[error("FEN must have 6 fields, got {0}")]
    FieldCount(usize),
    #[error("Invalid FEN position: {0}")]
    InvalidPosition(String),
}
