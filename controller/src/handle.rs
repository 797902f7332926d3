use cozy_chess::{Piece, Square};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{InputReply, MatchCommand, MatchError};
use super::events::MatchEvent;
use super::snapshot::MatchSnapshot;

/// Cheap, cloneable handle to a match actor.
#[derive(Clone)]
pub struct MatchHandle {
    id: String,
    cmd_tx: mpsc::Sender<MatchCommand>,
}

impl MatchHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<MatchCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn click(&self, square: Square) -> Result<InputReply, MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Click { square, reply: tx }).await?;
        rx.await.map_err(|_| MatchError::Closed)
    }

    pub async fn pick_promotion(&self, piece: Piece) -> Result<InputReply, MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::PickPromotion { piece, reply: tx })
            .await?;
        rx.await.map_err(|_| MatchError::Closed)
    }

    pub async fn cancel(&self) -> Result<InputReply, MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Cancel { reply: tx }).await?;
        rx.await.map_err(|_| MatchError::Closed)
    }

    pub async fn reset(&self) -> Result<MatchSnapshot, MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Reset { reply: tx }).await?;
        rx.await.map_err(|_| MatchError::Closed)
    }

    pub async fn snapshot(&self) -> Result<MatchSnapshot, MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::GetSnapshot { reply: tx }).await?;
        rx.await.map_err(|_| MatchError::Closed)
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(MatchSnapshot, broadcast::Receiver<MatchEvent>), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Subscribe { reply: tx }).await?;
        rx.await.map_err(|_| MatchError::Closed)
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(MatchCommand::Shutdown).await;
    }

    /// Resolves once the actor has exited.
    pub async fn closed(&self) {
        self.cmd_tx.closed().await
    }

    async fn send(&self, cmd: MatchCommand) -> Result<(), MatchError> {
        self.cmd_tx.send(cmd).await.map_err(|_| MatchError::Closed)
    }
}
