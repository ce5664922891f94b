//! Resource room naming
//!
//! Maps a resource identifier to the presence room its members join, and back.

use crate::ROOM_PREFIX;

/// Format the room name of a resource
pub fn format(resource_id: &str) -> String {
    format!("{}{}", ROOM_PREFIX, resource_id)
}

/// Extract the resource identifier from a room name
///
/// Returns `None` for rooms that were not produced by [`format`].
pub fn parse(room: &str) -> Option<&str> {
    room.strip_prefix(ROOM_PREFIX)
}

pub fn is_resource_room(room: &str) -> bool {
    room.starts_with(ROOM_PREFIX)
}
