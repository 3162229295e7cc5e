//! Agent seams: handling a message locally and sending one to a peer

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Message;

/// An agent that answers every message with a reply envelope.
///
/// Handlers recover their own failures into user-facing replies, so the
/// transport layer only ever sees a `Message`.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message) -> Message;

    /// Agent name, for logging and agent cards
    fn name(&self) -> &str;
}

/// A peer agent reached over the network
#[async_trait]
pub trait RemoteAgent: Send + Sync {
    async fn send(&self, message: Message) -> Result<Message>;

    /// Where the peer lives, for logging
    fn endpoint(&self) -> &str;
}
