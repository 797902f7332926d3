//! Coordinate ("UCI") move notation: `e2e4`, `e7e8q`.
//!
//! The rules engine encodes castling as king-takes-rook (`e1h1`); engines and
//! players use the standard king destination (`e1g1`). Both directions are
//! converted here.

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciMoveError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

/// Parse a coordinate token (`e2e4`, `e7e8q`) into a move.
pub fn parse_uci_move(s: &str) -> Result<Move, UciMoveError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(UciMoveError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = match s.chars().nth(4) {
        None => None,
        Some('q') => Some(Piece::Queen),
        Some('r') => Some(Piece::Rook),
        Some('b') => Some(Piece::Bishop),
        Some('n') => Some(Piece::Knight),
        Some(_) => return Err(UciMoveError::InvalidPromotion(s.to_string())),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Parse a square name such as `e4`.
pub fn parse_square(s: &str) -> Result<Square, UciMoveError> {
    let mut chars = s.chars();
    let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(UciMoveError::InvalidSquare(s.to_string()));
    };

    let file = match file.to_ascii_lowercase() {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return Err(UciMoveError::InvalidSquare(s.to_string())),
    };

    let rank = match rank {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return Err(UciMoveError::InvalidSquare(s.to_string())),
    };

    Ok(Square::new(file, rank))
}

/// Format a square as `e4`.
pub fn format_square(sq: Square) -> String {
    let file = (b'a' + sq.file() as u8) as char;
    let rank = (b'1' + sq.rank() as u8) as char;
    format!("{}{}", file, rank)
}

/// Lowercase promotion letter for a piece.
pub fn promotion_char(piece: Piece) -> char {
    match piece {
        Piece::Queen => 'q',
        Piece::Rook => 'r',
        Piece::Bishop => 'b',
        Piece::Knight => 'n',
        Piece::Pawn => 'p',
        Piece::King => 'k',
    }
}

/// Format a move as a coordinate token. Castling keeps whatever encoding the
/// move carries; see [`to_standard_castling`].
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(promotion_char(promo));
    }
    s
}

/// Convert standard castling notation (king moves two squares) into the
/// king-takes-rook form the rules engine generates.
///
/// The conversion only happens when the converted move is in `legal_moves`;
/// anything else is returned unchanged.
pub fn to_cozy_castling(mv: Move, legal_moves: &[Move]) -> Move {
    let is_back_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_castling_target = matches!(mv.to.file(), File::G | File::C) && mv.to.rank() == mv.from.rank();

    if !(is_back_rank && is_e_file && is_castling_target) || mv.promotion.is_some() {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        _ => File::A,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if legal_moves.contains(&converted) {
        converted
    } else {
        mv
    }
}

/// Convert a king-takes-rook castling move into standard notation
/// (destination on the g or c file). Other moves are returned unchanged.
pub fn to_standard_castling(board: &Board, mv: Move) -> Move {
    let mover = board.color_on(mv.from);
    let is_castle = board.piece_on(mv.from) == Some(Piece::King)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && board.color_on(mv.to) == mover;
    if !is_castle {
        return mv;
    }

    let king_file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    }
}
