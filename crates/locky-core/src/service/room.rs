//! Handle on the broadcast room of a resource

use std::fmt;
use std::sync::Arc;

use locky_api::{Presence, RoomMessage};
use locky_common::room;

#[derive(Clone)]
pub struct RoomHandle {
    name: String,
    presence: Arc<dyn Presence>,
}

impl RoomHandle {
    pub fn new(resource: &str, presence: Arc<dyn Presence>) -> Self {
        Self {
            name: room::format(resource),
            presence,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send a message to every member of the room
    pub fn send(&self, message: RoomMessage) {
        self.presence.broadcast(&self.name, message);
    }
}

impl fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomHandle").field("name", &self.name).finish()
    }
}
