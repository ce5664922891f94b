//! Identity resolution contract

use std::fmt;

use async_trait::async_trait;

use locky_common::Locker;

use crate::presence::Connection;

/// Maps a connection to the identity it acts for
///
/// Called once per room per connection on every heartbeat, so implementations
/// must be idempotent.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, connection: &dyn Connection) -> anyhow::Result<Option<Locker>>;
}

/// Adapts a synchronous closure into an [`IdentityResolver`]
pub struct FnResolver<F> {
    f: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&dyn Connection) -> anyhow::Result<Option<Locker>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> IdentityResolver for FnResolver<F>
where
    F: Fn(&dyn Connection) -> anyhow::Result<Option<Locker>> + Send + Sync,
{
    async fn resolve(&self, connection: &dyn Connection) -> anyhow::Result<Option<Locker>> {
        (self.f)(connection)
    }
}
