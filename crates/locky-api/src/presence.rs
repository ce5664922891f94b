//! Presence (transport) contract
//!
//! The presence layer owns room membership, join notifications, connection
//! enumeration, and message delivery. Locky only consumes it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use locky_common::LockyError;

use crate::model::{PresenceEvent, RoomMessage};

/// A live client connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Stable identifier of the connection
    fn id(&self) -> &str;

    /// Rooms the connection currently belongs to
    async fn rooms(&self) -> anyhow::Result<Vec<String>>;
}

pub type ConnectionRef = Arc<dyn Connection>;

pub trait Presence: Send + Sync {
    /// Subscribe to join and close notifications
    fn subscribe(&self) -> broadcast::Receiver<PresenceEvent>;

    /// Currently connected sessions
    fn connections(&self) -> Vec<ConnectionRef>;

    /// Deliver a message to every member of a room, best effort
    fn broadcast(&self, room: &str, message: RoomMessage);

    /// Host error channel
    fn emit_error(&self, _error: &LockyError) {}
}
