use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::uci::{parse_uci_message, EngineProtocolError, EngineStartError, UciError, UciMessage};
use crate::{EngineOpponent, EngineTimeouts};

type EngineReader = Lines<BufReader<Box<dyn AsyncRead + Unpin + Send>>>;
type EngineWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// A UCI engine session: one request/response exchange at a time over the
/// engine's stdin/stdout.
pub struct UciEngine {
    child: Option<Child>,
    writer: EngineWriter,
    lines: EngineReader,
    name: Option<String>,
    timeouts: EngineTimeouts,
    /// The engine's output reached EOF.
    closed: bool,
    /// A search was abandoned; stale output must be drained before the next.
    desynced: bool,
    shut_down: bool,
}

enum LineError {
    Timeout,
    Io(std::io::Error),
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    UciOk,
    ReadyOk,
}

impl Marker {
    fn as_str(self) -> &'static str {
        match self {
            Self::UciOk => "uciok",
            Self::ReadyOk => "readyok",
        }
    }

    fn matches(self, msg: &UciMessage) -> bool {
        matches!(
            (self, msg),
            (Self::UciOk, UciMessage::UciOk) | (Self::ReadyOk, UciMessage::ReadyOk)
        )
    }
}

impl UciEngine {
    /// Spawn the engine at `path` and complete the UCI handshake.
    ///
    /// The process is killed if the handle is dropped.
    #[tracing::instrument(level = "info", skip(timeouts))]
    pub async fn start(path: &Path, timeouts: EngineTimeouts) -> Result<Self, EngineStartError> {
        tracing::debug!("Spawning engine process");
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                tracing::error!("Failed to spawn engine: {}", source);
                EngineStartError::Spawn {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        let stdin = child.stdin.take().ok_or(EngineStartError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(EngineStartError::NoStdout)?;

        let mut engine = Self::wrap(Some(child), Box::new(stdout), Box::new(stdin), timeouts);
        engine.handshake().await?;
        tracing::info!(name = ?engine.name, "Engine ready");
        Ok(engine)
    }

    /// Run the handshake over an already-connected transport.
    pub async fn from_io<R, W>(
        reader: R,
        writer: W,
        timeouts: EngineTimeouts,
    ) -> Result<Self, EngineStartError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut engine = Self::wrap(None, Box::new(reader), Box::new(writer), timeouts);
        engine.handshake().await?;
        Ok(engine)
    }

    fn wrap(
        child: Option<Child>,
        reader: Box<dyn AsyncRead + Unpin + Send>,
        writer: EngineWriter,
        timeouts: EngineTimeouts,
    ) -> Self {
        Self {
            child,
            writer,
            lines: BufReader::new(reader).lines(),
            name: None,
            timeouts,
            closed: false,
            desynced: false,
            shut_down: false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn handshake(&mut self) -> Result<(), EngineStartError> {
        self.send("uci").await?;
        self.await_marker(Marker::UciOk).await?;
        self.send("isready").await?;
        self.await_marker(Marker::ReadyOk).await
    }

    async fn await_marker(&mut self, marker: Marker) -> Result<(), EngineStartError> {
        let deadline = Instant::now() + self.timeouts.handshake;
        loop {
            let line = match self.next_line(deadline).await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::warn!("Engine closed before {}", marker.as_str());
                    return Err(EngineStartError::Closed(marker.as_str()));
                }
                Err(LineError::Timeout) => {
                    tracing::error!("Timeout waiting for {}", marker.as_str());
                    return Err(EngineStartError::Timeout(marker.as_str()));
                }
                Err(LineError::Io(e)) => return Err(EngineStartError::Io(e)),
            };

            match parse_uci_message(&line) {
                Ok(msg) if marker.matches(&msg) => {
                    tracing::debug!("Received {}", marker.as_str());
                    return Ok(());
                }
                Ok(UciMessage::Id { name, value }) if name == "name" => {
                    self.name = Some(value);
                }
                _ => {}
            }
        }
    }

    async fn next_line(&mut self, deadline: Instant) -> Result<Option<String>, LineError> {
        match tokio::time::timeout_at(deadline, self.lines.next_line()).await {
            Err(_) => Err(LineError::Timeout),
            Ok(Err(e)) => Err(LineError::Io(e)),
            Ok(Ok(None)) => {
                self.closed = true;
                Ok(None)
            }
            Ok(Ok(Some(line))) => {
                tracing::trace!("UCI << {}", line.trim());
                Ok(Some(line))
            }
        }
    }

    async fn send(&mut self, command: &str) -> std::io::Result<()> {
        tracing::trace!("UCI >> {}", command);
        self.writer.write_all(command.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    fn ensure_usable(&self) -> Result<(), EngineProtocolError> {
        if self.shut_down {
            Err(EngineProtocolError::ShutDown)
        } else if self.closed {
            Err(EngineProtocolError::Closed)
        } else {
            Ok(())
        }
    }

    /// Stop any abandoned search and discard its output up to `readyok`.
    async fn resync(&mut self) -> Result<(), EngineProtocolError> {
        tracing::debug!("Resynchronising engine after abandoned search");
        self.send("stop").await?;
        self.send("isready").await?;

        let deadline = Instant::now() + self.timeouts.handshake;
        loop {
            match self.next_line(deadline).await {
                Ok(Some(line)) => {
                    if matches!(parse_uci_message(&line), Ok(UciMessage::ReadyOk)) {
                        self.desynced = false;
                        return Ok(());
                    }
                }
                Ok(None) => return Err(EngineProtocolError::Closed),
                Err(LineError::Timeout) => {
                    return Err(EngineProtocolError::Timeout(self.timeouts.handshake))
                }
                Err(LineError::Io(e)) => return Err(EngineProtocolError::Io(e)),
            }
        }
    }

    /// Send `UCI_LimitStrength` and `UCI_Elo`. No acknowledgement is awaited.
    pub async fn configure_strength(&mut self, elo: u32) -> Result<(), EngineProtocolError> {
        self.ensure_usable()?;
        tracing::info!("Limiting engine strength to Elo {}", elo);
        self.send("setoption name UCI_LimitStrength value true")
            .await?;
        self.send(&format!("setoption name UCI_Elo value {}", elo))
            .await?;
        Ok(())
    }

    /// Search `fen` for `think_time` and return the `bestmove` token.
    pub async fn best_move(
        &mut self,
        fen: &str,
        think_time: Duration,
    ) -> Result<String, EngineProtocolError> {
        self.ensure_usable()?;
        if self.desynced {
            self.resync().await?;
        }

        self.send(&format!("position fen {}", fen)).await?;
        self.send(&format!("go movetime {}", think_time.as_millis()))
            .await?;

        let budget = think_time + self.timeouts.search_grace;
        let deadline = Instant::now() + budget;
        loop {
            let line = match self.next_line(deadline).await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::warn!("Engine closed during search");
                    return Err(EngineProtocolError::Closed);
                }
                Err(LineError::Timeout) => {
                    tracing::warn!("No bestmove within {:?}", budget);
                    self.desynced = true;
                    return Err(EngineProtocolError::Timeout(budget));
                }
                Err(LineError::Io(e)) => return Err(EngineProtocolError::Io(e)),
            };

            match parse_uci_message(&line) {
                Ok(UciMessage::BestMove { token, .. }) => {
                    if token == "(none)" || token == "0000" {
                        return Err(EngineProtocolError::NoMove);
                    }
                    tracing::debug!("Engine chose {}", token);
                    return Ok(token);
                }
                Ok(UciMessage::Info(info)) => {
                    tracing::debug!(depth = ?info.depth, score = ?info.score, "search info");
                }
                Err(UciError::MalformedMessage(line)) if line.starts_with("bestmove") => {
                    return Err(EngineProtocolError::Malformed(line));
                }
                _ => {}
            }
        }
    }

    /// Send `quit`, give the process a second to exit, then kill it.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if !self.closed {
            let _ = self.send("quit").await;
        }
        if let Some(mut child) = self.child.take() {
            if tokio::time::timeout(Duration::from_secs(1), child.wait())
                .await
                .is_err()
            {
                tracing::warn!("Engine did not exit after quit, killing");
                let _ = child.kill().await;
            }
        }
        tracing::info!("Engine shut down");
    }
}

#[async_trait]
impl EngineOpponent for UciEngine {
    fn name(&self) -> Option<&str> {
        UciEngine::name(self)
    }

    async fn configure_strength(&mut self, elo: u32) -> Result<(), EngineProtocolError> {
        UciEngine::configure_strength(self, elo).await
    }

    async fn best_move(
        &mut self,
        fen: &str,
        think_time: Duration,
    ) -> Result<String, EngineProtocolError> {
        UciEngine::best_move(self, fen, think_time).await
    }

    async fn shutdown(&mut self) {
        UciEngine::shutdown(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split, DuplexStream};
    use tokio::task::JoinHandle;

    const FEN: &str = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1";

    fn fast() -> EngineTimeouts {
        EngineTimeouts {
            handshake: Duration::from_millis(200),
            search_grace: Duration::from_millis(200),
        }
    }

    /// Answer each received line with the lines `respond` returns; collect
    /// everything received until `quit` or EOF.
    fn stub<F>(peer: DuplexStream, mut respond: F) -> JoinHandle<Vec<String>>
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        tokio::spawn(async move {
            let (read, mut write) = split(peer);
            let mut lines = BufReader::new(read).lines();
            let mut received = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                for reply in respond(&line) {
                    if write.write_all(format!("{}\n", reply).as_bytes()).await.is_err() {
                        return received;
                    }
                }
                let quit = line == "quit";
                received.push(line);
                if quit {
                    break;
                }
            }
            received
        })
    }

    fn stockfish_like(line: &str) -> Vec<String> {
        let replies: &[&str] = match line.split_whitespace().next() {
            Some("uci") => &[
                "id name StubEngine",
                "id author Nobody",
                "option name UCI_Elo type spin default 1320 min 1320 max 3190",
                "uciok",
            ],
            Some("isready") => &["readyok"],
            Some("go") => &[
                "info depth 1 seldepth 1 score cp 20 nodes 20 pv d7d5",
                "info string NNUE evaluation enabled",
                "bestmove d7d5 ponder c2c4",
            ],
            _ => &[],
        };
        replies.iter().map(|s| s.to_string()).collect()
    }

    async fn connect<F>(respond: F) -> (UciEngine, JoinHandle<Vec<String>>)
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        let (ours, theirs) = duplex(4096);
        let peer = stub(theirs, respond);
        let (read, write) = split(ours);
        let engine = UciEngine::from_io(read, write, fast()).await.unwrap();
        (engine, peer)
    }

    #[tokio::test]
    async fn test_handshake_records_name() {
        let (mut engine, peer) = connect(stockfish_like).await;
        assert_eq!(engine.name(), Some("StubEngine"));

        engine.shutdown().await;
        let received = peer.await.unwrap();
        assert_eq!(received, vec!["uci", "isready", "quit"]);
    }

    #[tokio::test]
    async fn test_handshake_eof_is_an_error() {
        let (ours, theirs) = duplex(4096);
        tokio::spawn(async move {
            let (read, mut write) = split(theirs);
            let mut lines = BufReader::new(read).lines();
            let _ = lines.next_line().await;
            let _ = write.write_all(b"id name StubEngine\n").await;
        });

        let (read, write) = split(ours);
        let result = UciEngine::from_io(read, write, fast()).await;
        assert!(matches!(result, Err(EngineStartError::Closed("uciok"))));
    }

    #[tokio::test]
    async fn test_handshake_times_out_on_silent_engine() {
        let (ours, _theirs) = duplex(4096);
        let (read, write) = split(ours);
        let timeouts = EngineTimeouts {
            handshake: Duration::from_millis(50),
            ..fast()
        };

        let result = UciEngine::from_io(read, write, timeouts).await;
        assert!(matches!(result, Err(EngineStartError::Timeout("uciok"))));
    }

    #[tokio::test]
    async fn test_handshake_requires_readyok() {
        let (ours, theirs) = duplex(4096);
        let _peer = stub(theirs, |line| match line {
            "uci" => vec!["uciok".to_string()],
            _ => vec![],
        });
        let (read, write) = split(ours);

        let result = UciEngine::from_io(read, write, fast()).await;
        assert!(matches!(result, Err(EngineStartError::Timeout("readyok"))));
    }

    #[tokio::test]
    async fn test_best_move_sends_position_and_movetime() {
        let (mut engine, peer) = connect(stockfish_like).await;

        engine.configure_strength(1200).await.unwrap();
        let token = engine
            .best_move(FEN, Duration::from_millis(300))
            .await
            .unwrap();
        assert_eq!(token, "d7d5");

        engine.shutdown().await;
        let received = peer.await.unwrap();
        assert_eq!(
            received,
            vec![
                "uci".to_string(),
                "isready".to_string(),
                "setoption name UCI_LimitStrength value true".to_string(),
                "setoption name UCI_Elo value 1200".to_string(),
                format!("position fen {}", FEN),
                "go movetime 300".to_string(),
                "quit".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_best_move_none_is_no_move() {
        let (mut engine, _peer) = connect(|line| match line.split_whitespace().next() {
            Some("go") => vec!["bestmove (none)".to_string()],
            _ => stockfish_like(line),
        })
        .await;

        let result = engine.best_move(FEN, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(EngineProtocolError::NoMove)));
    }

    #[tokio::test]
    async fn test_best_move_eof_is_closed() {
        let (ours, theirs) = duplex(4096);
        tokio::spawn(async move {
            let (read, mut write) = split(theirs);
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                for reply in stockfish_like(&line) {
                    if line.starts_with("go") {
                        return;
                    }
                    let _ = write.write_all(format!("{}\n", reply).as_bytes()).await;
                }
            }
        });
        let (read, write) = split(ours);
        let mut engine = UciEngine::from_io(read, write, fast()).await.unwrap();

        let result = engine.best_move(FEN, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(EngineProtocolError::Closed)));
        let again = engine.best_move(FEN, Duration::from_millis(10)).await;
        assert!(matches!(again, Err(EngineProtocolError::Closed)));
    }

    #[tokio::test]
    async fn test_timeout_then_resync() {
        let mut stopped = false;
        let (mut engine, _peer) = connect(move |line| match line.split_whitespace().next() {
            Some("go") if !stopped => vec!["info depth 1".to_string()],
            Some("go") => vec!["bestmove e7e5".to_string()],
            Some("stop") => {
                stopped = true;
                vec!["bestmove d7d5".to_string()]
            }
            _ => stockfish_like(line),
        })
        .await;

        let first = engine.best_move(FEN, Duration::from_millis(10)).await;
        assert!(matches!(first, Err(EngineProtocolError::Timeout(_))));

        // The stale bestmove emitted on stop is drained, not returned.
        let second = engine
            .best_move(FEN, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(second, "e7e5");
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (mut engine, _peer) = connect(stockfish_like).await;
        engine.shutdown().await;
        engine.shutdown().await;

        let result = engine.best_move(FEN, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(EngineProtocolError::ShutDown)));
    }

    #[tokio::test]
    async fn test_start_missing_binary() {
        let result = UciEngine::start(
            Path::new("/nonexistent/path/to/engine"),
            EngineTimeouts::default(),
        )
        .await;
        assert!(matches!(result, Err(EngineStartError::Spawn { .. })));
    }
}
