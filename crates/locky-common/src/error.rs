//! Error types for Locky
//!
//! `LockyError` covers the three classes of failure the coordinator knows about:
//! - construction errors, returned synchronously and fatal for the coordinator
//! - resolution errors, wrapping a collaborator failure for a single event
//! - configuration loading errors

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum LockyError {
    #[error("You must define a lock store.")]
    MissingStore,

    #[error("You must specify a TTL for the lock.")]
    MissingTtl,

    #[error("You must implement an identity resolver.")]
    MissingResolver,

    #[error("You must define a presence layer.")]
    MissingPresence,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("identity resolution failed: {source}")]
    Identity {
        #[source]
        source: anyhow::Error,
    },

    #[error("lock store error on '{resource}': {source}")]
    Store {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot list rooms of connection '{connection_id}': {source}")]
    Rooms {
        connection_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl LockyError {
    pub fn store(resource: &str, source: anyhow::Error) -> Self {
        Self::Store {
            resource: resource.to_string(),
            source,
        }
    }

    pub fn rooms(connection_id: &str, source: anyhow::Error) -> Self {
        Self::Rooms {
            connection_id: connection_id.to_string(),
            source,
        }
    }

    /// Whether the error aborts coordinator construction
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::MissingStore
                | Self::MissingTtl
                | Self::MissingResolver
                | Self::MissingPresence
                | Self::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LockyError>;
