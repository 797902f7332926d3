//! Line-based front end: typed squares become board clicks, and every
//! state change redraws the board (or prints a JSON line).

use chess::{format_move_list, parse_square, CellMark, DisplayBoard, PieceKind, UciMoveError};
use controller::{
    format_clock, InputOutcome, MatchEvent, MatchHandle, MatchSnapshot, TurnView,
};
use cozy_chess::{Piece, Square};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

/// Moves shown under the board.
const HISTORY_LINES: usize = 5;

const HELP: &str = "\
Commands:
  e2          select or move to a square
  e2e4, e7e8q play a move in one go
  q r b n     choose a promotion piece
  x, cancel   drop the current selection or promotion
  reset       start the match again
  show        redraw the board
  help        this text
  quit        leave";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Click(Square),
    Move {
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    },
    Promote(Piece),
    Cancel,
    Reset,
    Show,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error)]
enum InputError {
    #[error("Unrecognised input '{0}', type 'help' for commands")]
    Unrecognised(String),
    #[error(transparent)]
    Square(#[from] UciMoveError),
}

fn parse_input(line: &str) -> Result<Input, InputError> {
    let token = line.trim().to_ascii_lowercase();
    match token.as_str() {
        "quit" | "exit" => return Ok(Input::Quit),
        "x" | "cancel" => return Ok(Input::Cancel),
        "reset" => return Ok(Input::Reset),
        "show" | "" => return Ok(Input::Show),
        "help" | "?" => return Ok(Input::Help),
        _ => {}
    }

    let mut chars = token.chars();
    match (token.len(), chars.next()) {
        (1, Some(c)) => PieceKind::promotion_from_char(c)
            .map(Input::Promote)
            .ok_or_else(|| InputError::Unrecognised(token.clone())),
        (2, _) => Ok(Input::Click(parse_square(&token)?)),
        (4 | 5, _) => {
            let mv = chess::parse_uci_move(&token)?;
            Ok(Input::Move {
                from: mv.from,
                to: mv.to,
                promotion: mv.promotion,
            })
        }
        _ => Err(InputError::Unrecognised(token.clone())),
    }
}

/// Drive the match from stdin until `quit`, end of input, or the actor
/// going away. Shuts the match down on the way out.
pub async fn run(handle: MatchHandle, json: bool, flipped: bool) -> anyhow::Result<()> {
    let (snapshot, mut events) = handle.subscribe().await?;
    if !json {
        println!("{HELP}\n");
    }
    draw(&snapshot, json, flipped)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Ok(Input::Quit) => break,
                    Ok(input) => submit(&handle, input, json, flipped).await?,
                    Err(e) => println!("{e}"),
                }
            }
            event = events.recv() => match event {
                Ok(MatchEvent::StateChanged(snapshot)) => draw(&snapshot, json, flipped)?,
                Ok(MatchEvent::EngineFailed { reason, retrying }) => {
                    let next = if retrying { "retrying" } else { "giving up" };
                    println!("Engine failed: {reason} ({next})");
                }
                Ok(MatchEvent::Error(message)) => println!("Error: {message}"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Terminal fell behind match events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    handle.shutdown().await;
    if tokio::time::timeout(Duration::from_secs(3), handle.closed())
        .await
        .is_err()
    {
        tracing::warn!("Match actor did not stop in time");
    }
    Ok(())
}

/// Send one input to the match. Accepted inputs redraw through the event
/// stream; only rejections are reported here.
async fn submit(
    handle: &MatchHandle,
    input: Input,
    json: bool,
    flipped: bool,
) -> anyhow::Result<()> {
    let outcome = match input {
        Input::Click(square) => handle.click(square).await?.0,
        Input::Move {
            from,
            to,
            promotion,
        } => {
            let (outcome, _) = handle.click(from).await?;
            if outcome != InputOutcome::Selected {
                outcome
            } else {
                match (handle.click(to).await?.0, promotion) {
                    (InputOutcome::PromotionPending, Some(piece)) => {
                        handle.pick_promotion(piece).await?.0
                    }
                    (outcome, _) => outcome,
                }
            }
        }
        Input::Promote(piece) => handle.pick_promotion(piece).await?.0,
        Input::Cancel => handle.cancel().await?.0,
        Input::Reset => {
            handle.reset().await?;
            InputOutcome::Cancelled
        }
        Input::Show => {
            draw(&handle.snapshot().await?, json, flipped)?;
            InputOutcome::Cancelled
        }
        Input::Help => {
            println!("{HELP}");
            InputOutcome::Cancelled
        }
        Input::Quit => InputOutcome::Cancelled,
    };

    if outcome == InputOutcome::Ignored && !json {
        println!("Not now.");
    }
    Ok(())
}

fn draw(snapshot: &MatchSnapshot, json: bool, flipped: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{}", render(snapshot, flipped)?);
    }
    Ok(())
}

fn render(snapshot: &MatchSnapshot, flipped: bool) -> anyhow::Result<String> {
    let board = DisplayBoard::from_fen(&snapshot.fen)?;
    let text = board.render(flipped, |file, rank| {
        let name = format!("{}{}", (b'a' + file) as char, rank + 1);
        cell_mark(snapshot, &name)
    });

    let mut out = text;
    if let Some(clock) = &snapshot.clock {
        out.push_str(&format!(
            "White {}   Black {}\n",
            format_clock(Duration::from_millis(clock.white_remaining_ms)),
            format_clock(Duration::from_millis(clock.black_remaining_ms)),
        ));
        if !clock.flag_fallen.is_empty() {
            out.push_str(&format!("Flag fallen: {}\n", clock.flag_fallen.join(", ")));
        }
    }

    let sans: Vec<&str> = snapshot.history.iter().map(|m| m.san.as_str()).collect();
    let moves = format_move_list(&sans);
    for line in moves.iter().skip(moves.len().saturating_sub(HISTORY_LINES)) {
        out.push_str(line);
        out.push('\n');
    }

    out.push_str(&status_line(snapshot));
    Ok(out)
}

fn cell_mark(snapshot: &MatchSnapshot, square: &str) -> Option<CellMark> {
    if snapshot.selected.as_deref() == Some(square) {
        return Some(CellMark::Selected);
    }
    if snapshot.legal_targets.iter().any(|t| t == square) {
        return Some(CellMark::Target);
    }
    if snapshot.checked_king.as_deref() == Some(square) {
        return Some(CellMark::Check);
    }
    match &snapshot.last_move {
        Some((from, to)) if from == square || to == square => Some(CellMark::LastMove),
        _ => None,
    }
}

fn status_line(snapshot: &MatchSnapshot) -> String {
    if let Some(outcome) = &snapshot.outcome {
        return format!("Game over: {outcome}");
    }

    let side = match snapshot.side_to_move.as_str() {
        "white" => "White",
        _ => "Black",
    };
    match snapshot.turn {
        TurnView::EngineThinking => {
            let name = snapshot.engine_name.as_deref().unwrap_or("Engine");
            format!("{name} is thinking...")
        }
        TurnView::PendingPromotion => "Promote to q, r, b or n (x cancels)".to_string(),
        _ if snapshot.in_check => format!("{side} to move, check!"),
        _ => format!("{side} to move"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller::{spawn_match, MatchSetup};

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input("quit").unwrap(), Input::Quit);
        assert_eq!(parse_input("  Reset ").unwrap(), Input::Reset);
        assert_eq!(parse_input("x").unwrap(), Input::Cancel);
        assert_eq!(parse_input("").unwrap(), Input::Show);
    }

    #[test]
    fn test_parse_squares_and_moves() {
        assert_eq!(parse_input("e2").unwrap(), Input::Click(sq("e2")));
        assert_eq!(
            parse_input("E2E4").unwrap(),
            Input::Move {
                from: sq("e2"),
                to: sq("e4"),
                promotion: None
            }
        );
        assert_eq!(
            parse_input("e7e8q").unwrap(),
            Input::Move {
                from: sq("e7"),
                to: sq("e8"),
                promotion: Some(Piece::Queen)
            }
        );
    }

    #[test]
    fn test_parse_promotion_letters() {
        assert_eq!(parse_input("n").unwrap(), Input::Promote(Piece::Knight));
        assert!(parse_input("k").is_err());
        assert!(parse_input("z9").is_err());
        assert!(parse_input("hello world").is_err());
    }

    #[tokio::test]
    async fn test_render_marks_selection_and_targets() {
        let handle = spawn_match(MatchSetup::local(), None).unwrap();
        let (_, snapshot) = handle.click(sq("g1")).await.unwrap();

        let text = render(&snapshot, false).unwrap();
        assert!(text.contains("[N]"));
        assert!(text.contains("(.)"));
        assert!(text.ends_with("White to move"));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_move_input_plays_promotion() {
        let handle = spawn_match(
            MatchSetup {
                start_fen: Some("k7/4P3/8/8/8/8/8/4K3 w - - 0 1".to_string()),
                ..MatchSetup::local()
            },
            None,
        )
        .unwrap();

        submit(&handle, parse_input("e7e8q").unwrap(), true, false)
            .await
            .unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.history[0].uci, "e7e8q");
        assert!(render(&snapshot, true).unwrap().contains("<Q>"));
        handle.shutdown().await;
    }
}
