//! Locky Common - Shared types and utilities
//!
//! This crate provides the foundational pieces used across all Locky components:
//! - Error types
//! - Resource room naming
//! - Common constants

pub mod error;
pub mod room;

// Re-exports for convenience
pub use error::{LockyError, Result};

/// Prefix of every room that carries a resource
pub const ROOM_PREFIX: &str = "locky:";

/// Prefix of the events broadcast into resource rooms
pub const EVENT_PREFIX: &str = "locky:";

/// Identity of a lock holder
pub type Locker = String;
