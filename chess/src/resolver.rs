//! Turns board clicks into legal moves.
//!
//! Square-level queries a presentation needs between clicks: which
//! destinations a piece can reach, whether a from/to pair needs a promotion
//! piece, and the final decoded move.

use cozy_chess::{BitBoard, Board, Color, Move, Piece, Rank, Square};

use crate::game::decode_move;
use crate::uci::{format_square, promotion_char, to_standard_castling};

/// Destinations of every legal move starting on `from`.
///
/// Castling is reported on the king's standard destination (g or c file).
/// Empty when `from` is empty or holds a piece of the side not to move.
pub fn legal_targets(board: &Board, from: Square) -> BitBoard {
    if board.color_on(from) != Some(board.side_to_move()) {
        return BitBoard::EMPTY;
    }

    let mut targets = BitBoard::EMPTY;
    board.generate_moves_for(from.bitboard(), |moves| {
        for mv in moves {
            targets |= to_standard_castling(board, mv).to.bitboard();
        }
        false
    });
    targets
}

/// True when `from` holds a pawn of the side to move and `to` is on that
/// side's last rank.
pub fn is_promotion(board: &Board, from: Square, to: Square) -> bool {
    let mover = board.side_to_move();
    if board.piece_on(from) != Some(Piece::Pawn) || board.color_on(from) != Some(mover) {
        return false;
    }

    let last_rank = match mover {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    };
    to.rank() == last_rank
}

/// Build the move for a from/to pair (plus promotion piece) if it is legal.
pub fn resolve(board: &Board, from: Square, to: Square, promotion: Option<Piece>) -> Option<Move> {
    let mut token = format!("{}{}", format_square(from), format_square(to));
    if let Some(piece) = promotion {
        token.push(promotion_char(piece));
    }
    decode_move(board, &token).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn legal_moves(board: &Board) -> Vec<Move> {
        let mut moves = Vec::new();
        board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    #[test]
    fn test_start_position_targets() {
        let board = Board::default();
        let targets = legal_targets(&board, sq("e2"));
        assert_eq!(targets.len(), 2);
        assert!(targets.has(sq("e3")));
        assert!(targets.has(sq("e4")));

        assert_eq!(legal_targets(&board, sq("g1")).len(), 2);
        assert!(legal_targets(&board, sq("e4")).is_empty());
        assert!(legal_targets(&board, sq("e7")).is_empty());
    }

    #[test]
    fn test_castling_targets_use_king_destination() {
        let board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let targets = legal_targets(&board, sq("e1"));
        assert!(targets.has(sq("g1")));
        assert!(targets.has(sq("c1")));
        assert!(!targets.has(sq("h1")));
        assert!(!targets.has(sq("a1")));

        let castle = resolve(&board, sq("e1"), sq("g1"), None).unwrap();
        assert_eq!(castle.to, sq("h1"));
    }

    #[test]
    fn test_is_promotion() {
        let board: Board = "k7/4P3/8/8/8/8/p7/4K3 w - - 0 1".parse().unwrap();
        assert!(is_promotion(&board, sq("e7"), sq("e8")));
        // Black pawn, but White to move.
        assert!(!is_promotion(&board, sq("a2"), sq("a1")));
        assert!(!is_promotion(&board, sq("e1"), sq("e2")));

        let black: Board = "k7/4P3/8/8/8/8/p7/4K3 b - - 0 1".parse().unwrap();
        assert!(is_promotion(&black, sq("a2"), sq("a1")));
        assert!(!is_promotion(&black, sq("e7"), sq("e8")));
    }

    #[test]
    fn test_resolve() {
        let board = Board::default();
        let mv = resolve(&board, sq("e2"), sq("e4"), None).unwrap();
        assert_eq!((mv.from, mv.to), (sq("e2"), sq("e4")));
        assert_eq!(resolve(&board, sq("e2"), sq("e5"), None), None);

        let promo: Board = "k7/4P3/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let mv = resolve(&promo, sq("e7"), sq("e8"), Some(Piece::Queen)).unwrap();
        assert_eq!(mv.promotion, Some(Piece::Queen));
        assert_eq!(resolve(&promo, sq("e7"), sq("e8"), None), None);
    }

    /// Play one legal move per choice, stopping early at a terminal position.
    fn random_walk(choices: &[prop::sample::Index]) -> Board {
        let mut board = Board::default();
        for choice in choices {
            let moves = legal_moves(&board);
            if moves.is_empty() {
                break;
            }
            board.play_unchecked(*choice.get(&moves));
        }
        board
    }

    fn walk() -> impl Strategy<Value = Vec<prop::sample::Index>> {
        prop::collection::vec(any::<prop::sample::Index>(), 0..40)
    }

    proptest! {
        #[test]
        fn targets_match_legal_moves(choices in walk(), index in 0usize..64) {
            let board = random_walk(&choices);
            let from = Square::index(index);
            let targets = legal_targets(&board, from);
            let has_move = legal_moves(&board).iter().any(|mv| mv.from == from);

            prop_assert_eq!(!targets.is_empty(), has_move);
            if board.color_on(from) != Some(board.side_to_move()) {
                prop_assert!(targets.is_empty());
            }
            for to in targets {
                let promotion = is_promotion(&board, from, to).then_some(Piece::Queen);
                prop_assert!(resolve(&board, from, to, promotion).is_some());
            }
        }

        #[test]
        fn promotion_only_for_pawns_of_mover(choices in walk(), from in 0usize..64, to in 0usize..64) {
            let board = random_walk(&choices);
            let (from, to) = (Square::index(from), Square::index(to));
            if is_promotion(&board, from, to) {
                prop_assert_eq!(board.piece_on(from), Some(Piece::Pawn));
                prop_assert_eq!(board.color_on(from), Some(board.side_to_move()));
            }
        }
    }
}
