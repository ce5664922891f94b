//! Coordinator events
//!
//! Observability stream published by the coordinator. Errors surfaced here
//! never stop the reactor.

use std::fmt;
use std::sync::Arc;

use locky_common::LockyError;

/// Decision taken for a join (or a heartbeat re-join)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The room does not carry a resource
    Ignored,
    /// The connection has no identity
    Anonymous,
    /// The resource was unheld and has been claimed
    Acquired,
    /// The resource is held by the joining identity and has been refreshed
    Refreshed,
    /// The resource is held by someone else
    HeldByOther,
    /// The resource is unheld but auto locking is off
    AutoLockDisabled,
}

impl JoinOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinOutcome::Ignored => "ignored",
            JoinOutcome::Anonymous => "anonymous",
            JoinOutcome::Acquired => "acquired",
            JoinOutcome::Refreshed => "refreshed",
            JoinOutcome::HeldByOther => "held_by_other",
            JoinOutcome::AutoLockDisabled => "auto_lock_disabled",
        }
    }

    /// Whether the store was mutated
    pub fn is_mutation(self) -> bool {
        matches!(self, JoinOutcome::Acquired | JoinOutcome::Refreshed)
    }
}

impl fmt::Display for JoinOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug)]
pub enum CoordinatorEvent {
    /// A collaborator failed while handling one event
    Error(Arc<LockyError>),
    /// The heartbeat is about to re-run the negotiation for a membership
    RefreshAttempt {
        resource: String,
        room: String,
        connection_id: String,
    },
    /// A negotiation finished
    Negotiated {
        resource: String,
        connection_id: String,
        outcome: JoinOutcome,
    },
}
