//! Connection registry: live connections, room membership, and the per-user
//! offline buffer.
//!
//! State is process-local. A horizontally scaled deployment would need a
//! shared backplane behind the same `register` / `deliver` contract.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::Message;
use serde_json::Value;
use shipwatch_core::identity::{AuthError, Identity, IdentityVerifier};
use shipwatch_core::rooms::{role_room, user_room, DeliveryTarget};
use shipwatch_core::types::{DbId, Timestamp};
use shipwatch_events::Envelope;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Channel sender half for pushing frames to one connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Sends between cooperative yields during a room broadcast.
const YIELD_EVERY: usize = 64;

const PRESENCE_CHANNEL_CAPACITY: usize = 256;

/// Default age after which buffered events are discarded.
pub const DEFAULT_BUFFER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct Connection {
    identity: Identity,
    sender: WsSender,
    rooms: HashSet<String>,
    connected_at: Timestamp,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<String, Connection>,
    users: HashMap<DbId, HashSet<String>>,
    rooms: HashMap<String, HashSet<String>>,
    buffers: HashMap<DbId, VecDeque<Envelope>>,
}

impl RegistryState {
    fn join(&mut self, conn_id: &str, room: String) -> bool {
        let Some(conn) = self.connections.get_mut(conn_id) else {
            return false;
        };
        conn.rooms.insert(room.clone());
        self.rooms.entry(room).or_default().insert(conn_id.to_string());
        true
    }

    /// Move a user's unexpired buffered events onto `sender`, oldest first.
    fn replay_buffer(&mut self, user_id: DbId, sender: &WsSender, ttl: Duration) -> usize {
        let Some(pending) = self.buffers.remove(&user_id) else {
            return 0;
        };
        let now = chrono::Utc::now();
        let mut count = 0;
        for envelope in pending.into_iter().filter(|e| !is_expired(e, now, ttl)) {
            let text = envelope.into_replayed().to_text();
            if sender.send(Message::Text(text.into())).is_err() {
                break;
            }
            count += 1;
        }
        count
    }

    fn leave(&mut self, conn_id: &str, room: &str) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(conn_id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}

fn is_expired(envelope: &Envelope, now: Timestamp, ttl: Duration) -> bool {
    (now - envelope.timestamp).to_std().is_ok_and(|age| age >= ttl)
}

/// A user's first connection opened or last connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    Online(Identity),
    Offline(Identity),
}

/// What a delivery did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Connections the frame was handed to.
    pub delivered: usize,
    /// Offline users whose buffer took the event.
    pub buffered: usize,
}

pub struct ConnectionRegistry {
    verifier: Arc<dyn IdentityVerifier>,
    state: RwLock<RegistryState>,
    buffer_capacity: usize,
    buffer_ttl: Duration,
    presence: broadcast::Sender<PresenceChange>,
}

impl ConnectionRegistry {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, buffer_capacity: usize) -> Self {
        let (presence, _) = broadcast::channel(PRESENCE_CHANNEL_CAPACITY);
        Self {
            verifier,
            state: RwLock::new(RegistryState::default()),
            buffer_capacity,
            buffer_ttl: DEFAULT_BUFFER_TTL,
            presence,
        }
    }

    /// Discard buffered events older than `ttl`.
    pub fn with_buffer_ttl(mut self, ttl: Duration) -> Self {
        self.buffer_ttl = ttl;
        self
    }

    /// Verify a handshake token. Creates no state.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        match token {
            Some(token) if !token.is_empty() => self.verifier.verify(token).await,
            _ => Err(AuthError::MissingToken),
        }
    }

    /// Register an authenticated connection, join its user and role rooms,
    /// and replay the user's offline buffer onto it.
    ///
    /// The replay happens under the same write lock that makes the user
    /// online, so buffered events always precede live ones. Returns the
    /// receiver the caller forwards to the socket sink.
    pub async fn register(
        &self,
        conn_id: String,
        identity: Identity,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let user_id = identity.user_id;
        let (first, replayed) = {
            let mut state = self.state.write().await;
            let replayed = state.replay_buffer(user_id, &tx, self.buffer_ttl);
            let conn = Connection {
                identity: identity.clone(),
                sender: tx,
                rooms: HashSet::new(),
                connected_at: chrono::Utc::now(),
            };
            state.connections.insert(conn_id.clone(), conn);

            let sessions = state.users.entry(user_id).or_default();
            let first = sessions.is_empty();
            sessions.insert(conn_id.clone());

            state.join(&conn_id, user_room(user_id));
            for role in &identity.roles {
                state.join(&conn_id, role_room(role));
            }
            (first, replayed)
        };

        tracing::debug!(conn_id = %conn_id, user_id, first, replayed, "Connection registered");
        if first {
            let _ = self.presence.send(PresenceChange::Online(identity));
        }
        rx
    }

    /// Remove a connection from every room. Returns its identity if it was
    /// registered.
    pub async fn unregister(&self, conn_id: &str) -> Option<Identity> {
        let (identity, last) = {
            let mut state = self.state.write().await;
            let conn = state.connections.remove(conn_id)?;
            for room in &conn.rooms {
                state.leave(conn_id, room);
            }

            let user_id = conn.identity.user_id;
            let last = match state.users.get_mut(&user_id) {
                Some(sessions) => {
                    sessions.remove(conn_id);
                    sessions.is_empty()
                }
                None => true,
            };
            if last {
                state.users.remove(&user_id);
            }
            tracing::debug!(
                conn_id,
                user_id,
                connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds(),
                "Connection unregistered",
            );
            (conn.identity, last)
        };

        if last {
            let _ = self.presence.send(PresenceChange::Offline(identity.clone()));
        }
        Some(identity)
    }

    /// Add a connection to a room. `false` if the connection is unknown.
    pub async fn join_room(&self, conn_id: &str, room: &str) -> bool {
        self.state.write().await.join(conn_id, room.to_string())
    }

    pub async fn leave_room(&self, conn_id: &str, room: &str) {
        let mut state = self.state.write().await;
        if let Some(conn) = state.connections.get_mut(conn_id) {
            conn.rooms.remove(room);
        }
        state.leave(conn_id, room);
    }

    /// Deliver one event to a single target.
    pub async fn deliver(&self, target: &DeliveryTarget, event: &str, data: Value) -> DeliveryReport {
        self.deliver_all(std::slice::from_ref(target), event, data).await
    }

    /// Deliver one event to several targets, at most once per connection.
    ///
    /// A `User` target with no live connection has the event appended to
    /// that user's buffer, evicting the oldest entry at capacity.
    pub async fn deliver_all(
        &self,
        targets: &[DeliveryTarget],
        event: &str,
        data: Value,
    ) -> DeliveryReport {
        self.deliver_all_except(targets, &[], event, data).await
    }

    /// [`deliver_all`](Self::deliver_all), skipping connections that are
    /// members of any `except` room.
    pub async fn deliver_all_except(
        &self,
        targets: &[DeliveryTarget],
        except: &[DeliveryTarget],
        event: &str,
        data: Value,
    ) -> DeliveryReport {
        let envelope = Envelope::new(event, data);
        let mut report = DeliveryReport::default();

        let senders: Vec<WsSender> = {
            let mut state = self.state.write().await;
            let mut recipients: HashSet<String> = HashSet::new();

            for target in targets {
                if let DeliveryTarget::User(user_id) = target {
                    if !state.users.contains_key(user_id) {
                        self.buffer(&mut state, *user_id, envelope.clone());
                        report.buffered += 1;
                        continue;
                    }
                }
                if let Some(members) = state.rooms.get(&target.room()) {
                    recipients.extend(members.iter().cloned());
                }
            }
            for skipped in except {
                if let Some(members) = state.rooms.get(&skipped.room()) {
                    recipients.retain(|id| !members.contains(id));
                }
            }

            recipients
                .iter()
                .filter_map(|id| state.connections.get(id))
                .map(|conn| conn.sender.clone())
                .collect()
        };

        let text = envelope.to_text();
        for (i, sender) in senders.iter().enumerate() {
            if sender.send(Message::Text(text.clone().into())).is_ok() {
                report.delivered += 1;
            }
            if (i + 1) % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }

        tracing::trace!(
            event,
            delivered = report.delivered,
            buffered = report.buffered,
            "Event delivered",
        );
        report
    }

    fn buffer(&self, state: &mut RegistryState, user_id: DbId, envelope: Envelope) {
        if self.buffer_capacity == 0 {
            return;
        }
        let queue = state.buffers.entry(user_id).or_default();
        while queue.len() >= self.buffer_capacity {
            queue.pop_front();
            tracing::debug!(user_id, "Offline buffer full, dropped oldest event");
        }
        queue.push_back(envelope);
    }

    /// Drop expired buffered events, and buffers left empty. Returns the
    /// number of events discarded.
    pub async fn prune_buffers(&self) -> usize {
        let now = chrono::Utc::now();
        let mut state = self.state.write().await;
        let mut pruned = 0;
        state.buffers.retain(|user_id, queue| {
            // Queues are in arrival order, so expiry only ever trims the front.
            while queue.front().is_some_and(|e| is_expired(e, now, self.buffer_ttl)) {
                queue.pop_front();
                pruned += 1;
            }
            if queue.is_empty() {
                tracing::trace!(user_id, "Offline buffer expired");
            }
            !queue.is_empty()
        });
        pruned
    }

    /// Send directly to one connection. `false` if it is gone.
    pub async fn send_to_connection(&self, conn_id: &str, envelope: &Envelope) -> bool {
        let state = self.state.read().await;
        state
            .connections
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(Message::Text(envelope.to_text().into())).is_ok())
    }

    pub async fn buffered_count(&self, user_id: DbId) -> usize {
        self.state
            .read()
            .await
            .buffers
            .get(&user_id)
            .map_or(0, VecDeque::len)
    }

    /// Users holding at least one buffered event.
    pub async fn buffered_user_count(&self) -> usize {
        self.state.read().await.buffers.len()
    }

    pub async fn is_online(&self, user_id: DbId) -> bool {
        self.state.read().await.users.contains_key(&user_id)
    }

    pub async fn room_size(&self, room: &str) -> usize {
        self.state.read().await.rooms.get(room).map_or(0, HashSet::len)
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Presence changes, consumed by the fanout.
    pub fn subscribe_presence(&self) -> broadcast::Receiver<PresenceChange> {
        self.presence.subscribe()
    }

    /// Send a Ping frame to every connection.
    pub async fn ping_all(&self) {
        let state = self.state.read().await;
        for conn in state.connections.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send Close to every connection and drop all connection state.
    /// Buffers are kept.
    pub async fn shutdown_all(&self) {
        let mut state = self.state.write().await;
        for (conn_id, conn) in state.connections.drain() {
            if conn.sender.send(Message::Close(None)).is_err() {
                tracing::debug!(conn_id = %conn_id, "Connection already closed");
            }
        }
        state.users.clear();
        state.rooms.clear();
    }
}
