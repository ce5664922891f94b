//! Locky API - collaborator contracts
//!
//! This crate provides:
//! - Lock store contract and lifecycle events
//! - Presence (transport) contract and room messages
//! - Identity resolution contract

pub mod identity;
pub mod model;
pub mod presence;
pub mod store;

// Re-export commonly used types
pub use identity::{FnResolver, IdentityResolver};
pub use model::*;
pub use presence::{Connection, ConnectionRef, Presence};
pub use store::LockStore;
