//! Plain-text board drawing for terminals and logs.

use cozy_chess::Board;

use crate::fen::{parse_fen, FenError};
use crate::types::{PieceColor, PieceKind};

type Cell = Option<(PieceKind, PieceColor)>;

/// Piece placement indexed `[rank][file]`, White's back rank first.
#[derive(Debug, Clone, Default)]
pub struct DisplayBoard {
    squares: [[Cell; 8]; 8],
}

impl DisplayBoard {
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        parse_fen(fen).map(|board| Self::from_board(&board))
    }

    pub fn from_board(board: &Board) -> Self {
        let mut squares = [[None; 8]; 8];
        for sq in board.occupied() {
            if let (Some(piece), Some(color)) = (board.piece_on(sq), board.color_on(sq)) {
                squares[sq.rank() as usize][sq.file() as usize] =
                    Some((piece.into(), color.into()));
            }
        }
        Self { squares }
    }

    pub fn piece_at(&self, file: u8, rank: u8) -> Cell {
        self.squares
            .get(rank as usize)
            .and_then(|row| row.get(file as usize))
            .copied()
            .flatten()
    }

    /// Draw the board as text, White at the bottom unless `flipped`.
    ///
    /// `mark` is asked for every square as `(file, rank)`; marked cells are
    /// bracketed so highlights survive a plain terminal.
    pub fn render(&self, flipped: bool, mark: impl Fn(u8, u8) -> Option<CellMark>) -> String {
        let order = |i: u8| if flipped { i } else { 7 - i };
        let file_at = |i: u8| if flipped { 7 - i } else { i };

        let mut out = String::new();
        for row in 0..8 {
            let rank = order(row);
            out.push((b'1' + rank) as char);
            out.push(' ');
            for col in 0..8 {
                let file = file_at(col);
                let glyph = match self.piece_at(file, rank) {
                    Some((kind, PieceColor::White)) => kind.to_char_upper(),
                    Some((kind, PieceColor::Black)) => kind.to_char_lower(),
                    None => '.',
                };
                let [open, close] = mark(file, rank).map_or([' ', ' '], CellMark::brackets);
                out.extend([open, glyph, close]);
            }
            out.push('\n');
        }

        out.push_str("  ");
        for col in 0..8 {
            out.extend([' ', (b'a' + file_at(col)) as char, ' ']);
        }
        out.push('\n');
        out
    }
}

/// Highlight applied to a rendered square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMark {
    Selected,
    Target,
    LastMove,
    Check,
}

impl CellMark {
    fn brackets(self) -> [char; 2] {
        match self {
            Self::Selected => ['[', ']'],
            Self::Target => ['(', ')'],
            Self::LastMove => ['<', '>'],
            Self::Check => ['!', '!'],
        }
    }
}
