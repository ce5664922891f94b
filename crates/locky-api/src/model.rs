//! Models exchanged between the coordinator and its collaborators

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use locky_common::{EVENT_PREFIX, Locker};

use crate::presence::ConnectionRef;

/// Acquire command sent to the lock store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockParams {
    pub resource: String,
    pub locker: Locker,
    /// Claim the resource even if a locker appeared since it was last queried
    #[serde(default)]
    pub force: bool,
}

impl LockParams {
    pub fn new(resource: impl Into<String>, locker: impl Into<Locker>) -> Self {
        Self {
            resource: resource.into(),
            locker: locker.into(),
            force: false,
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Kind of lock lifecycle event emitted by the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockEventKind {
    Lock,
    Unlock,
    Expire,
}

impl LockEventKind {
    pub const ALL: [LockEventKind; 3] = [Self::Lock, Self::Unlock, Self::Expire];

    pub fn as_str(self) -> &'static str {
        match self {
            LockEventKind::Lock => "lock",
            LockEventKind::Unlock => "unlock",
            LockEventKind::Expire => "expire",
        }
    }

    /// Name of the event broadcast into the resource room
    pub fn room_event(self) -> String {
        format!("{}{}", EVENT_PREFIX, self.as_str())
    }
}

impl fmt::Display for LockEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LockEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lock" => Ok(LockEventKind::Lock),
            "unlock" => Ok(LockEventKind::Unlock),
            "expire" => Ok(LockEventKind::Expire),
            _ => Err(format!("Invalid lock event: {}", s)),
        }
    }
}

/// Lock lifecycle event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockEvent {
    pub kind: LockEventKind,
    pub resource: String,
    pub locker: Option<Locker>,
    /// Store specific trailing arguments, forwarded untouched
    #[serde(default)]
    pub extra: Vec<Value>,
}

impl LockEvent {
    pub fn new(kind: LockEventKind, resource: impl Into<String>, locker: Option<Locker>) -> Self {
        Self {
            kind,
            resource: resource.into(),
            locker,
            extra: Vec::new(),
        }
    }

    pub fn lock(resource: impl Into<String>, locker: impl Into<Locker>) -> Self {
        Self::new(LockEventKind::Lock, resource, Some(locker.into()))
    }

    pub fn unlock(resource: impl Into<String>, locker: Option<Locker>) -> Self {
        Self::new(LockEventKind::Unlock, resource, locker)
    }

    pub fn expire(resource: impl Into<String>, locker: Option<Locker>) -> Self {
        Self::new(LockEventKind::Expire, resource, locker)
    }

    pub fn with_extra(mut self, extra: Vec<Value>) -> Self {
        self.extra = extra;
        self
    }
}

/// Message broadcast to every member of a room
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomMessage {
    pub event: String,
    pub resource: String,
    pub locker: Option<Locker>,
    #[serde(default)]
    pub extra: Vec<Value>,
}

impl From<LockEvent> for RoomMessage {
    fn from(event: LockEvent) -> Self {
        Self {
            event: event.kind.room_event(),
            resource: event.resource,
            locker: event.locker,
            extra: event.extra,
        }
    }
}

/// Event emitted by the presence layer
#[derive(Clone)]
pub enum PresenceEvent {
    /// A connection joined a room
    Join {
        room: String,
        connection: ConnectionRef,
    },
    /// The hosting session ended
    Close,
}

impl fmt::Debug for PresenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceEvent::Join { room, connection } => f
                .debug_struct("Join")
                .field("room", room)
                .field("connection", &connection.id())
                .finish(),
            PresenceEvent::Close => write!(f, "Close"),
        }
    }
}

impl PresenceEvent {
    pub fn join(room: impl Into<String>, connection: ConnectionRef) -> Self {
        Self::Join {
            room: room.into(),
            connection,
        }
    }
}
