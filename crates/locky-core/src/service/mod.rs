// Lock coordination services

pub mod coordinator;
pub mod event;
pub mod room;

// Re-export commonly used types
pub use coordinator::{LockCoordinator, LockCoordinatorBuilder};
pub use event::{CoordinatorEvent, JoinOutcome};
pub use room::RoomHandle;
