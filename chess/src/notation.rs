//! Standard Algebraic Notation and move-list formatting.

use cozy_chess::{Board, Move, Piece, Square};

use crate::uci::format_square;

/// SAN for `mv` played from `board` (the position before the move).
///
/// `mv` uses the rules engine's encoding, so castling arrives as
/// king-takes-rook.
pub fn san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return format!("{}{}", format_square(mv.from), format_square(mv.to));
    };
    let mover = board.side_to_move();

    let mut san = String::new();
    if piece == Piece::King && board.color_on(mv.to) == Some(mover) {
        if (mv.to.file() as u8) > (mv.from.file() as u8) {
            san.push_str("O-O");
        } else {
            san.push_str("O-O-O");
        }
    } else {
        let is_capture = board.color_on(mv.to) == Some(!mover)
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        match piece {
            Piece::Pawn => {
                if is_capture {
                    san.push(file_char(mv.from));
                }
            }
            _ => {
                san.push(piece_letter(piece));
                san.push_str(&disambiguation(board, mv, piece));
            }
        }

        if is_capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_letter(promo));
        }
    }

    let mut after = board.clone();
    if after.try_play(mv).is_ok() && !after.checkers().is_empty() {
        if has_legal_move(&after) {
            san.push('+');
        } else {
            san.push('#');
        }
    }

    san
}

/// Number plies into move-list lines: `["1. e4 e5", "2. Nf3"]`.
pub fn format_move_list<S: AsRef<str>>(sans: &[S]) -> Vec<String> {
    sans.chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let mut line = format!("{}. {}", i + 1, pair[0].as_ref());
            if let Some(reply) = pair.get(1) {
                line.push(' ');
                line.push_str(reply.as_ref());
            }
            line
        })
        .collect()
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let mut rivals: Vec<Square> = Vec::new();
    board.generate_moves(|moves| {
        if moves.piece == piece && moves.from != mv.from && moves.to.has(mv.to) {
            rivals.push(moves.from);
        }
        false
    });

    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|sq| sq.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|sq| sq.rank() == mv.from.rank());
    let square = format_square(mv.from);
    match (shares_file, shares_rank) {
        (false, _) => square[..1].to_string(),
        (true, false) => square[1..].to_string(),
        (true, true) => square,
    }
}

fn has_legal_move(board: &Board) -> bool {
    board.generate_moves(|_| true)
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn file_char(square: Square) -> char {
    (b'a' + square.file() as u8) as char
}
