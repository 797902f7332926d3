pub mod board_display;
pub mod fen;
pub mod game;
pub mod notation;
pub mod resolver;
pub mod types;
pub mod uci;

pub use board_display::{CellMark, DisplayBoard};
pub use fen::{format_fen, parse_fen, FenError, START_FEN};
pub use game::{decode_move, Game, GameError, MoveRecord, PositionStatus};
pub use notation::format_move_list;
pub use types::{PieceColor, PieceKind, PROMOTION_PIECES};
pub use uci::{format_square, format_uci_move, parse_square, parse_uci_move, UciMoveError};
