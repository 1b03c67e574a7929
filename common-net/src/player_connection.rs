use async_trait::async_trait;
use thiserror::Error;

use crate::player_message::PlayerMessage;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("connection closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

/// The capability the matchmaking core needs from a player's transport: push
/// a message and check liveness. Everything else about the connection
/// (protocol, reconnection, framing) is the transport's business.
#[async_trait]
pub trait PlayerConnection: Send + Sync {
    async fn send(&self, message: PlayerMessage) -> Result<(), SendError>;

    fn is_connected(&self) -> bool;
}
