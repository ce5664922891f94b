//! Lock store contract
//!
//! The store owns every lock record, its expiry, and the atomicity of acquire and
//! refresh. It reports lifecycle changes through [`LockStore::subscribe`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use locky_common::Locker;

use crate::model::{LockEvent, LockParams};

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Time-to-live applied to every lock, `None` if the store has none configured
    fn ttl(&self) -> Option<Duration>;

    /// Current holder of a resource
    async fn get_locker(&self, resource: &str) -> anyhow::Result<Option<Locker>>;

    /// Acquire a lock
    async fn lock(&self, params: LockParams) -> anyhow::Result<()>;

    /// Extend the TTL of a held lock without changing its owner
    async fn refresh(&self, resource: &str) -> anyhow::Result<()>;

    /// Subscribe to `lock`, `unlock` and `expire` events
    fn subscribe(&self) -> broadcast::Receiver<LockEvent>;
}
