//! chessmatch - play a match against a UCI engine (or a friend) in a plain
//! terminal.
//!
//! The binary wires three pieces together:
//! - a [`engine::UciEngine`] child process, located via `--engine`,
//!   `CHESSMATCH_ENGINE_PATH` or the usual Stockfish install paths,
//! - the match actor from the `controller` crate,
//! - a line-based front end in [`terminal`] that turns typed squares into
//!   board clicks and redraws on every state change.
//!
//! Logs go to a daily rolling file (see [`config`] for the tunables) so the
//! board on stdout stays readable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use controller::{setup::DEFAULT_MAX_ENGINE_RETRIES, MatchSetup, Opponent, BLITZ_3, BLITZ_5};
use cozy_chess::Color;
use engine::{EngineOpponent, EngineStartError, UciEngine};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod terminal;

/// Command-line arguments for chessmatch.
#[derive(Parser)]
#[command(name = "chessmatch", about = "Play chess against a UCI engine in the terminal")]
struct Cli {
    /// Path to a UCI engine binary. Falls back to CHESSMATCH_ENGINE_PATH,
    /// then to a Stockfish install.
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Engine strength as a UCI_Elo rating.
    #[arg(long, default_value_t = controller::DEFAULT_ELO,
          value_parser = clap::value_parser!(u32)
              .range(controller::MIN_ELO as i64..=controller::MAX_ELO as i64))]
    elo: u32,

    /// Engine think time per move, in milliseconds.
    #[arg(long, default_value_t = 300)]
    think_ms: u64,

    /// Which side the engine plays.
    #[arg(long, value_enum, default_value_t = Side::Black)]
    engine_side: Side,

    /// Two players at one keyboard, no engine.
    #[arg(long, conflicts_with_all = ["engine", "elo", "think_ms", "engine_side"])]
    local: bool,

    /// Play with a clock of this many seconds per side.
    #[arg(long, value_name = "SECS", group = "clock_preset")]
    clock: Option<u64>,

    /// 3 minute blitz clock.
    #[arg(long, group = "clock_preset")]
    blitz3: bool,

    /// 5 minute blitz clock.
    #[arg(long, group = "clock_preset")]
    blitz5: bool,

    /// End the game when a flag falls instead of only showing it.
    #[arg(long, requires = "clock_preset")]
    time_forfeit: bool,

    /// Start from this position instead of the initial one.
    #[arg(long)]
    fen: Option<String>,

    /// Failed engine replies retried before the engine forfeits.
    #[arg(long, default_value_t = DEFAULT_MAX_ENGINE_RETRIES)]
    max_engine_retries: u32,

    /// Print every state change as a JSON line instead of drawing the board.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

impl Cli {
    fn clock(&self) -> Option<Duration> {
        if self.blitz3 {
            Some(BLITZ_3)
        } else if self.blitz5 {
            Some(BLITZ_5)
        } else {
            self.clock.map(Duration::from_secs)
        }
    }

    fn match_setup(&self) -> MatchSetup {
        let opponent = if self.local {
            Opponent::Local
        } else {
            Opponent::Engine {
                side: self.engine_side.into(),
                elo: self.elo,
                think_time: Duration::from_millis(self.think_ms),
            }
        };

        MatchSetup {
            opponent,
            clock: self.clock(),
            time_forfeit: self.time_forfeit,
            start_fen: self.fen.clone(),
            max_engine_retries: self.max_engine_retries,
        }
    }

    /// Draw from Black's side when the engine has White.
    fn flipped(&self) -> bool {
        !self.local && self.engine_side == Side::White
    }
}

/// Create the log directory. Failures go to stderr; tracing is not
/// installed yet.
fn prepare_log_dir(dir: &Path) -> bool {
    match std::fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("warning: cannot create log directory {}: {}", dir.display(), e);
            false
        }
    }
}

fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = config::get_log_dir();
    prepare_log_dir(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "chessmatch.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    guard
}

async fn start_engine(cli: &Cli) -> anyhow::Result<Box<dyn EngineOpponent>> {
    let explicit = cli.engine.clone().or_else(config::get_engine_path);
    let path = engine::locate_engine(explicit.as_deref())
        .ok_or(EngineStartError::NotFound)
        .context("pass --engine or set CHESSMATCH_ENGINE_PATH")?;

    tracing::info!("Using engine at {}", path.display());
    let engine = UciEngine::start(&path, config::engine_timeouts())
        .await
        .with_context(|| format!("failed to start engine {}", path.display()))?;
    Ok(Box::new(engine))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing();

    let setup = cli.match_setup();
    let engine = match setup.opponent {
        Opponent::Local => None,
        Opponent::Engine { .. } => Some(start_engine(&cli).await?),
    };

    let handle = controller::spawn_match(setup, engine).context("failed to start match")?;
    terminal::run(handle, cli.json, cli.flipped()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_play_engine_as_black() {
        let cli = Cli::try_parse_from(["chessmatch"]).unwrap();
        let setup = cli.match_setup();
        assert_eq!(setup.engine_side(), Some(Color::Black));
        assert_eq!(setup.elo(), Some(1200));
        assert_eq!(setup.think_time(), Some(Duration::from_millis(300)));
        assert_eq!(setup.clock, None);
        assert!(!cli.flipped());
    }

    #[test]
    fn test_blitz_preset() {
        let cli = Cli::try_parse_from(["chessmatch", "--blitz3", "--time-forfeit"]).unwrap();
        let setup = cli.match_setup();
        assert_eq!(setup.clock, Some(Duration::from_secs(180)));
        assert!(setup.time_forfeit);
    }

    #[test]
    fn test_clock_presets_conflict() {
        assert!(Cli::try_parse_from(["chessmatch", "--blitz3", "--blitz5"]).is_err());
        assert!(Cli::try_parse_from(["chessmatch", "--clock", "60", "--blitz5"]).is_err());
        assert!(Cli::try_parse_from(["chessmatch", "--time-forfeit"]).is_err());
    }

    #[test]
    fn test_elo_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["chessmatch", "--elo", "700"]).is_err());
        assert!(Cli::try_parse_from(["chessmatch", "--elo", "2001"]).is_err());
        assert!(Cli::try_parse_from(["chessmatch", "--elo", "2000"]).is_ok());
    }

    #[test]
    fn test_local_has_no_engine() {
        let cli = Cli::try_parse_from(["chessmatch", "--local", "--clock", "90"]).unwrap();
        let setup = cli.match_setup();
        assert_eq!(setup.opponent, Opponent::Local);
        assert_eq!(setup.clock, Some(Duration::from_secs(90)));
        assert!(Cli::try_parse_from(["chessmatch", "--local", "--elo", "1500"]).is_err());
    }

    #[test]
    fn test_prepare_log_dir_reports_failure() {
        let blocker = std::env::temp_dir().join(format!("chessmatch-log-{}", std::process::id()));
        std::fs::write(&blocker, b"not a directory").unwrap();

        assert!(!prepare_log_dir(&blocker.join("logs")));
        assert!(prepare_log_dir(&std::env::temp_dir()));

        std::fs::remove_file(&blocker).unwrap();
    }

    #[test]
    fn test_engine_as_white_flips_board() {
        let cli = Cli::try_parse_from(["chessmatch", "--engine-side", "white"]).unwrap();
        assert_eq!(cli.match_setup().engine_side(), Some(Color::White));
        assert!(cli.flipped());
    }
}
