//! Lock coordinator - negotiates resource locks from presence events
//!
//! The coordinator reacts to three sources:
//! - presence joins: resolve the joining identity and claim, refresh, or leave
//!   the resource lock alone
//! - a heartbeat: replay the join negotiation for every live membership so that
//!   locks held by present users never reach their TTL
//! - lock store lifecycle events: rebroadcast them into the resource room
//!
//! Lock state is never cached. Every decision queries the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use metrics::counter;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use locky_api::{
    Connection, ConnectionRef, IdentityResolver, LockEvent, LockParams, LockStore, Presence,
    PresenceEvent, RoomMessage,
};
use locky_common::{LockyError, Result, room};

use super::event::{CoordinatorEvent, JoinOutcome};
use super::room::RoomHandle;
use crate::metrics::{
    COORDINATOR_ERRORS_TOTAL, HEARTBEAT_TICKS_TOTAL, LOCK_ACQUIRE_TOTAL, LOCK_REFRESH_TOTAL,
    ROOM_BROADCAST_TOTAL,
};
use crate::model::CoordinatorConfig;

const EVENT_QUEUE_SIZE: usize = 1024;

/// Reactor control message
#[derive(Debug)]
enum ReactorMessage {
    Shutdown,
}

/// Presence driven lock coordinator
///
/// Built with [`LockCoordinator::builder`]. Building spawns the reactor on the
/// current tokio runtime; it runs until [`shutdown`](Self::shutdown) is called,
/// the presence layer reports the end of the session, or the coordinator is
/// dropped.
pub struct LockCoordinator {
    inner: Arc<CoordinatorInner>,
    sender: mpsc::UnboundedSender<ReactorMessage>,
    running: Arc<AtomicBool>,
}

struct CoordinatorInner {
    store: Arc<dyn LockStore>,
    presence: Arc<dyn Presence>,
    resolver: Arc<dyn IdentityResolver>,
    auto_lock: bool,
    ttl: Duration,
    heartbeat_interval: Duration,
    events: broadcast::Sender<CoordinatorEvent>,
}

#[derive(Default)]
pub struct LockCoordinatorBuilder {
    store: Option<Arc<dyn LockStore>>,
    presence: Option<Arc<dyn Presence>>,
    resolver: Option<Arc<dyn IdentityResolver>>,
    config: CoordinatorConfig,
}

impl LockCoordinatorBuilder {
    pub fn store(mut self, store: Arc<dyn LockStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn presence(mut self, presence: Arc<dyn Presence>) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn auto_lock(mut self, auto_lock: bool) -> Self {
        self.config.auto_lock = auto_lock;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = Some(interval);
        self
    }

    /// Validate the collaborators and start the reactor
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<LockCoordinator> {
        let store = self.store.ok_or(LockyError::MissingStore)?;
        let ttl = store
            .ttl()
            .filter(|ttl| !ttl.is_zero())
            .ok_or(LockyError::MissingTtl)?;
        let resolver = self.resolver.ok_or(LockyError::MissingResolver)?;
        let presence = self.presence.ok_or(LockyError::MissingPresence)?;

        let heartbeat_interval = self.config.resolve_heartbeat_interval(ttl);
        if heartbeat_interval.is_zero() {
            return Err(LockyError::InvalidConfig(
                "heartbeat interval must be positive".to_string(),
            ));
        }

        let (events, _) = broadcast::channel(EVENT_QUEUE_SIZE);
        let inner = Arc::new(CoordinatorInner {
            store,
            presence,
            resolver,
            auto_lock: self.config.auto_lock,
            ttl,
            heartbeat_interval,
            events,
        });

        // Subscribe before spawning so no event emitted after build() is missed
        let presence_rx = inner.presence.subscribe();
        let store_rx = inner.store.subscribe();
        let (sender, receiver) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));

        tokio::spawn(run_reactor(
            inner.clone(),
            presence_rx,
            store_rx,
            receiver,
            running.clone(),
        ));

        info!(
            ttl_ms = ttl.as_millis() as u64,
            heartbeat_ms = heartbeat_interval.as_millis() as u64,
            auto_lock = inner.auto_lock,
            "Lock coordinator started"
        );

        Ok(LockCoordinator {
            inner,
            sender,
            running,
        })
    }
}

impl LockCoordinator {
    pub fn builder() -> LockCoordinatorBuilder {
        LockCoordinatorBuilder::default()
    }

    /// Negotiate the lock of the room's resource for a connection
    ///
    /// Returns `None` when a collaborator failed; the failure is reported on the
    /// event stream and the host error channel.
    pub async fn on_join(&self, room: &str, connection: &dyn Connection) -> Option<JoinOutcome> {
        self.inner.on_join(room, connection).await
    }

    /// Run one heartbeat pass over every live membership
    pub async fn refresh_locks(&self) {
        self.inner.refresh_locks().await;
    }

    /// Broadcast group of a resource
    pub fn locky_room(&self, resource: &str) -> RoomHandle {
        self.inner.locky_room(resource)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.inner.events.subscribe()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.inner.heartbeat_interval
    }

    pub fn auto_lock(&self) -> bool {
        self.inner.auto_lock
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the heartbeat and the reactor
    ///
    /// Join negotiations and heartbeat passes still in flight are aborted.
    pub fn shutdown(&self) {
        let _ = self.sender.send(ReactorMessage::Shutdown);
    }
}

impl Drop for LockCoordinator {
    fn drop(&mut self) {
        let _ = self.sender.send(ReactorMessage::Shutdown);
    }
}

async fn run_reactor(
    inner: Arc<CoordinatorInner>,
    mut presence_rx: broadcast::Receiver<PresenceEvent>,
    mut store_rx: broadcast::Receiver<LockEvent>,
    mut receiver: mpsc::UnboundedReceiver<ReactorMessage>,
    running: Arc<AtomicBool>,
) {
    let period = inner.heartbeat_interval;
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut store_open = true;
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                counter!(HEARTBEAT_TICKS_TOTAL).increment(1);
                let inner = inner.clone();
                track(&mut in_flight, tokio::spawn(async move { inner.refresh_locks().await }));
            }
            event = presence_rx.recv() => match event {
                Ok(PresenceEvent::Join { room, connection }) => {
                    if room::is_resource_room(&room) {
                        let inner = inner.clone();
                        track(&mut in_flight, tokio::spawn(async move {
                            inner.on_join(&room, connection.as_ref()).await;
                        }));
                    }
                }
                Ok(PresenceEvent::Close) => {
                    info!("Presence session closed");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Lock coordinator lagged behind presence events");
                }
                Err(RecvError::Closed) => {
                    info!("Presence event stream closed");
                    break;
                }
            },
            event = store_rx.recv(), if store_open => match event {
                Ok(event) => inner.broadcast_event(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Lock coordinator lagged behind lock store events");
                }
                Err(RecvError::Closed) => {
                    warn!("Lock store event stream closed, lifecycle broadcast disabled");
                    store_open = false;
                }
            },
            message = receiver.recv() => match message {
                Some(ReactorMessage::Shutdown) | None => break,
            },
        }
    }

    for handle in in_flight.drain(..) {
        handle.abort();
    }
    running.store(false, Ordering::SeqCst);
    info!("Lock coordinator stopped");
}

fn track(in_flight: &mut Vec<JoinHandle<()>>, handle: JoinHandle<()>) {
    in_flight.retain(|handle| !handle.is_finished());
    in_flight.push(handle);
}

/// Resource carried by a room; the bare prefix names no resource
fn resource_of(room: &str) -> Option<&str> {
    room::parse(room).filter(|resource| !resource.is_empty())
}

impl CoordinatorInner {
    async fn on_join(&self, room: &str, connection: &dyn Connection) -> Option<JoinOutcome> {
        match self.negotiate(room, connection).await {
            Ok(outcome) => {
                if let Some(resource) = resource_of(room) {
                    self.publish(CoordinatorEvent::Negotiated {
                        resource: resource.to_string(),
                        connection_id: connection.id().to_string(),
                        outcome,
                    });
                }
                Some(outcome)
            }
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    async fn negotiate(&self, room: &str, connection: &dyn Connection) -> Result<JoinOutcome> {
        let Some(resource) = resource_of(room) else {
            return Ok(JoinOutcome::Ignored);
        };

        let user = self
            .resolver
            .resolve(connection)
            .await
            .map_err(|source| LockyError::Identity { source })?;

        let Some(user) = user else {
            debug!(resource, connection_id = connection.id(), "Anonymous connection, skipping");
            return Ok(JoinOutcome::Anonymous);
        };

        let locker = self
            .store
            .get_locker(resource)
            .await
            .map_err(|e| LockyError::store(resource, e))?;

        match locker {
            None if self.auto_lock => {
                // Forced: whichever claim reaches the store last wins the race
                self.store
                    .lock(LockParams::new(resource, user.as_str()).forced())
                    .await
                    .map_err(|e| LockyError::store(resource, e))?;
                counter!(LOCK_ACQUIRE_TOTAL).increment(1);
                debug!(resource, locker = %user, "Lock acquired");
                Ok(JoinOutcome::Acquired)
            }
            None => {
                debug!(resource, "Resource unheld, auto lock disabled");
                Ok(JoinOutcome::AutoLockDisabled)
            }
            Some(holder) if holder == user => {
                self.store
                    .refresh(resource)
                    .await
                    .map_err(|e| LockyError::store(resource, e))?;
                counter!(LOCK_REFRESH_TOTAL).increment(1);
                debug!(resource, locker = %user, "Lock refreshed");
                Ok(JoinOutcome::Refreshed)
            }
            Some(holder) => {
                debug!(resource, locker = %holder, user = %user, "Resource held by another user");
                Ok(JoinOutcome::HeldByOther)
            }
        }
    }

    async fn refresh_locks(&self) {
        let connections = self.presence.connections();
        debug!(connections = connections.len(), "Refreshing locks");

        join_all(
            connections
                .iter()
                .map(|connection| self.refresh_connection(connection)),
        )
        .await;
    }

    async fn refresh_connection(&self, connection: &ConnectionRef) {
        let rooms = match connection.rooms().await {
            Ok(rooms) => rooms,
            Err(e) => {
                self.report(LockyError::rooms(connection.id(), e));
                return;
            }
        };

        for room in rooms {
            let Some(resource) = resource_of(&room) else {
                continue;
            };

            self.publish(CoordinatorEvent::RefreshAttempt {
                resource: resource.to_string(),
                room: room.clone(),
                connection_id: connection.id().to_string(),
            });

            self.on_join(&room, connection.as_ref()).await;
        }
    }

    fn broadcast_event(&self, event: LockEvent) {
        let room = self.locky_room(&event.resource);
        debug!(room = room.name(), event = %event.kind, "Broadcasting lock event");
        counter!(ROOM_BROADCAST_TOTAL).increment(1);
        room.send(RoomMessage::from(event));
    }

    fn locky_room(&self, resource: &str) -> RoomHandle {
        RoomHandle::new(resource, self.presence.clone())
    }

    fn report(&self, error: LockyError) {
        warn!(error = %error, "Lock coordination failed");
        counter!(COORDINATOR_ERRORS_TOTAL).increment(1);
        self.presence.emit_error(&error);
        self.publish(CoordinatorEvent::Error(Arc::new(error)));
    }

    fn publish(&self, event: CoordinatorEvent) {
        // No subscriber is not an error
        let _ = self.events.send(event);
    }
}
