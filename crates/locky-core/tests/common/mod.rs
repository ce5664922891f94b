//! Shared fixtures for coordinator integration tests
//!
//! - `MemoryLockStore`: TTL lock store on tokio's clock, records every call
//! - `MemoryPresence`: room membership hub, records broadcasts and errors
//! - `UserDirectory`: connection id to identity resolver

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

use locky_core::{
    Connection, ConnectionRef, CoordinatorEvent, IdentityResolver, LockCoordinator, LockEvent,
    LockParams, LockStore, Locker, LockyError, Presence, PresenceEvent, RoomMessage,
};

/// Let spawned handlers run to completion
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Everything published on a coordinator event stream so far
pub fn drain(rx: &mut broadcast::Receiver<CoordinatorEvent>) -> Vec<CoordinatorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ---------------------------------------------------------------------------
// Lock store
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    GetLocker(String),
    Lock(LockParams),
    Refresh(String),
}

struct LockEntry {
    owner: Locker,
    acquired_at: Instant,
}

pub struct MemoryLockStore {
    ttl: Option<Duration>,
    locks: DashMap<String, LockEntry>,
    events: broadcast::Sender<LockEvent>,
    calls: Mutex<Vec<StoreCall>>,
    fail_queries: AtomicBool,
    fail_mutations: AtomicBool,
    query_delay: Mutex<Option<Duration>>,
}

impl MemoryLockStore {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Self::with_ttl(Some(ttl))
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            ttl,
            locks: DashMap::new(),
            events,
            calls: Mutex::new(Vec::new()),
            fail_queries: AtomicBool::new(false),
            fail_mutations: AtomicBool::new(false),
            query_delay: Mutex::new(None),
        })
    }

    fn ttl_or_default(&self) -> Duration {
        self.ttl.unwrap_or(Duration::from_secs(30))
    }

    /// Current holder, expiring the lock first if its TTL elapsed
    pub fn holder(&self, resource: &str) -> Option<Locker> {
        let ttl = self.ttl_or_default();
        let expired = match self.locks.get(resource) {
            Some(entry) if entry.acquired_at.elapsed() <= ttl => return Some(entry.owner.clone()),
            Some(_) => true,
            None => false,
        };

        if expired
            && let Some((_, entry)) = self.locks.remove(resource)
        {
            let _ = self.events.send(LockEvent::expire(resource, Some(entry.owner)));
        }
        None
    }

    /// Release a lock the way an external actor would
    pub fn unlock(&self, resource: &str) {
        if let Some((_, entry)) = self.locks.remove(resource) {
            let _ = self.events.send(LockEvent::unlock(resource, Some(entry.owner)));
        }
    }

    pub fn emit(&self, event: LockEvent) {
        let _ = self.events.send(event);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn lock_calls(&self) -> Vec<LockParams> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Lock(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    pub fn refresh_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Refresh(resource) => Some(resource),
                _ => None,
            })
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, StoreCall::GetLocker(_)))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    async fn get_locker(&self, resource: &str) -> anyhow::Result<Option<Locker>> {
        self.calls
            .lock()
            .push(StoreCall::GetLocker(resource.to_string()));

        if self.fail_queries.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }

        // The answer is taken now and delivered after the delay
        let holder = self.holder(resource);
        let delay = *self.query_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(holder)
    }

    async fn lock(&self, params: LockParams) -> anyhow::Result<()> {
        self.calls.lock().push(StoreCall::Lock(params.clone()));

        if self.fail_mutations.load(Ordering::SeqCst) {
            anyhow::bail!("store rejected mutation");
        }

        if !params.force
            && let Some(holder) = self.holder(&params.resource)
            && holder != params.locker
        {
            anyhow::bail!("resource '{}' is locked by '{}'", params.resource, holder);
        }

        self.locks.insert(
            params.resource.clone(),
            LockEntry {
                owner: params.locker.clone(),
                acquired_at: Instant::now(),
            },
        );
        let _ = self.events.send(LockEvent::lock(params.resource, params.locker));
        Ok(())
    }

    async fn refresh(&self, resource: &str) -> anyhow::Result<()> {
        self.calls
            .lock()
            .push(StoreCall::Refresh(resource.to_string()));

        if self.fail_mutations.load(Ordering::SeqCst) {
            anyhow::bail!("store rejected mutation");
        }

        match self.locks.get_mut(resource) {
            Some(mut entry) => {
                entry.acquired_at = Instant::now();
                Ok(())
            }
            None => anyhow::bail!("resource '{}' is not locked", resource),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LockEvent> {
        self.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

pub struct MemoryConnection {
    id: String,
    rooms: Mutex<BTreeSet<String>>,
    fail_rooms: AtomicBool,
}

impl MemoryConnection {
    pub fn fail_rooms(&self, fail: bool) {
        self.fail_rooms.store(fail, Ordering::SeqCst);
    }

    pub fn leave(&self, room: &str) {
        self.rooms.lock().remove(room);
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn id(&self) -> &str {
        &self.id
    }

    async fn rooms(&self) -> anyhow::Result<Vec<String>> {
        if self.fail_rooms.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset");
        }
        Ok(self.rooms.lock().iter().cloned().collect())
    }
}

pub struct MemoryPresence {
    connections: DashMap<String, Arc<MemoryConnection>>,
    events: broadcast::Sender<PresenceEvent>,
    sent: Mutex<Vec<(String, RoomMessage)>>,
    errors: Mutex<Vec<String>>,
}

impl MemoryPresence {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            connections: DashMap::new(),
            events,
            sent: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        })
    }

    pub fn connect(&self, id: &str) -> Arc<MemoryConnection> {
        let connection = Arc::new(MemoryConnection {
            id: id.to_string(),
            rooms: Mutex::new(BTreeSet::new()),
            fail_rooms: AtomicBool::new(false),
        });
        self.connections.insert(id.to_string(), connection.clone());
        connection
    }

    pub fn join(&self, connection: &Arc<MemoryConnection>, room: &str) {
        connection.rooms.lock().insert(room.to_string());
        let connection: ConnectionRef = connection.clone();
        let _ = self.events.send(PresenceEvent::join(room, connection));
    }

    pub fn disconnect(&self, id: &str) {
        self.connections.remove(id);
    }

    pub fn close(&self) {
        let _ = self.events.send(PresenceEvent::Close);
    }

    pub fn sent(&self) -> Vec<(String, RoomMessage)> {
        self.sent.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl Presence for MemoryPresence {
    fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.events.subscribe()
    }

    fn connections(&self) -> Vec<ConnectionRef> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone() as ConnectionRef)
            .collect()
    }

    fn broadcast(&self, room: &str, message: RoomMessage) {
        self.sent.lock().push((room.to_string(), message));
    }

    fn emit_error(&self, error: &LockyError) {
        self.errors.lock().push(error.to_string());
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Resolves identities from a connection id map; unknown ids are anonymous
#[derive(Default)]
pub struct UserDirectory {
    users: DashMap<String, Locker>,
    fail: AtomicBool,
}

impl UserDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn assign(&self, connection_id: &str, user: &str) {
        self.users
            .insert(connection_id.to_string(), user.to_string());
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityResolver for UserDirectory {
    async fn resolve(&self, connection: &dyn Connection) -> anyhow::Result<Option<Locker>> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("invalid session");
        }
        Ok(self.users.get(connection.id()).map(|user| user.clone()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryLockStore>,
    pub presence: Arc<MemoryPresence>,
    pub users: Arc<UserDirectory>,
    pub coordinator: LockCoordinator,
}

impl Harness {
    /// TTL of 2000ms, default heartbeat, auto lock on
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    pub fn with(
        configure: impl FnOnce(locky_core::LockCoordinatorBuilder) -> locky_core::LockCoordinatorBuilder,
    ) -> Self {
        let store = MemoryLockStore::new(Duration::from_millis(2000));
        let presence = MemoryPresence::new();
        let users = UserDirectory::new();

        let builder = LockCoordinator::builder()
            .store(store.clone())
            .presence(presence.clone())
            .resolver(users.clone());
        let coordinator = configure(builder).build().expect("coordinator");

        Self {
            store,
            presence,
            users,
            coordinator,
        }
    }

    /// Connect `id` acting as `user` and join `room`
    pub fn join_as(&self, id: &str, user: &str, room: &str) -> Arc<MemoryConnection> {
        self.users.assign(id, user);
        let connection = self.presence.connect(id);
        self.presence.join(&connection, room);
        connection
    }
}
