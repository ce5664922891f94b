//! Locky Core - presence driven lock coordination
//!
//! This crate provides:
//! - The lock coordinator reactor (join negotiation, heartbeat refresh,
//!   lifecycle broadcast)
//! - Coordinator configuration
//! - Logging and metrics helpers for embedding hosts

pub mod logging;
pub mod metrics;
pub mod model;
pub mod service;

// Re-export commonly used types
pub use model::{Configuration, CoordinatorConfig};
pub use service::{CoordinatorEvent, JoinOutcome, LockCoordinator, LockCoordinatorBuilder, RoomHandle};

// Re-export collaborator contracts
pub use locky_api::{
    Connection, ConnectionRef, FnResolver, IdentityResolver, LockEvent, LockEventKind, LockParams,
    LockStore, Presence, PresenceEvent, RoomMessage,
};
pub use locky_common::{Locker, LockyError, room};
