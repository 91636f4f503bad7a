//! Topic-keyed registry of live WebSocket connections.
//!
//! One registry instance owns exactly one exclusive lock; `add`, `remove`,
//! `active_user_ids`, `broadcast`, and `send_to_one` all take it, so
//! broadcasts are serialized against mutation and against each other. That
//! trades throughput for simplicity and is fine at the connection counts
//! this server targets.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

use axum::extract::ws::Message;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::UserId;

/// Sender half of a connection's outbound channel. The writer task on the
/// other end owns the socket sink, so pushing here is the only way any part
/// of the system writes to a client.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Opaque connection id, unique for the registry's lifetime.
pub type ConnectionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The topic or connection id is not registered. Benign on cleanup
    /// paths: the connection may already have been closed from the other
    /// side.
    #[error("connection not found")]
    NotFound,
    /// `broadcast` was called for a topic no connection has ever joined.
    #[error("topic has no registered connections")]
    TopicNotRegistered,
    /// `send_to_one` found no live connection under the topic.
    #[error("no active connection")]
    NoActiveConnection,
}

/// A live socket bound to one user and registered under one topic.
#[derive(Debug)]
struct Connection {
    user_id: UserId,
    tx: ConnectionSender,
}

/// Concurrency-safe map of topic -> connection id -> connection.
///
/// A topic bucket with zero connections is kept in the map: for reads it is
/// equivalent to an absent bucket, but `broadcast` uses its presence to
/// distinguish "everyone left" (no-op) from "never existed"
/// (`TopicNotRegistered`).
pub struct ConnectionRegistry<K> {
    topics: Mutex<HashMap<K, HashMap<ConnectionId, Connection>>>,
}

impl<K> Default for ConnectionRegistry<K> {
    fn default() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Copy> ConnectionRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, HashMap<ConnectionId, Connection>>> {
        // Poisoning means another thread panicked while holding the lock;
        // there is no sane way to continue serving from this registry.
        self.topics.lock().expect("connection registry lock poisoned")
    }

    /// Register a connection under a topic, lazily creating the bucket.
    /// Returns a fresh id that is never reused while the registry lives.
    pub fn add(&self, topic: K, user_id: UserId, tx: ConnectionSender) -> ConnectionId {
        let id = Uuid::new_v4();
        self.lock()
            .entry(topic)
            .or_default()
            .insert(id, Connection { user_id, tx });
        id
    }

    /// Close a connection's socket and drop it from the registry. The bucket
    /// itself is kept even when it becomes empty.
    pub fn remove(&self, topic: K, id: ConnectionId) -> Result<(), RegistryError> {
        let mut topics = self.lock();
        let bucket = topics.get_mut(&topic).ok_or(RegistryError::NotFound)?;
        let conn = bucket.remove(&id).ok_or(RegistryError::NotFound)?;
        // Ask the writer task to close the socket. If the channel is already
        // gone the connection is tearing itself down, which is fine.
        let _ = conn.tx.send(Message::Close(None));
        Ok(())
    }

    /// Point-in-time snapshot of the distinct user ids under a topic,
    /// copied under the lock so iteration never races with add/remove.
    pub fn active_user_ids(&self, topic: K) -> Vec<UserId> {
        let topics = self.lock();
        let Some(bucket) = topics.get(&topic) else {
            return Vec::new();
        };
        let ids: BTreeSet<UserId> = bucket.values().map(|c| c.user_id).collect();
        ids.into_iter().collect()
    }

    /// Write one pre-serialized frame to every connection under the topic.
    ///
    /// Delivery is best-effort and at-most-once: a connection whose channel
    /// has closed is skipped with a warning and the remaining connections
    /// still receive the frame. Per-socket write order is preserved by the
    /// writer task; there is no cross-socket ordering guarantee.
    pub fn broadcast(&self, topic: K, frame: Message) -> Result<(), RegistryError> {
        let topics = self.lock();
        let bucket = topics.get(&topic).ok_or(RegistryError::TopicNotRegistered)?;
        for (id, conn) in bucket {
            if conn.tx.send(frame.clone()).is_err() {
                tracing::warn!(
                    connection_id = %id,
                    user_id = conn.user_id,
                    "skipping closed connection during broadcast"
                );
            }
        }
        Ok(())
    }

    /// Deliver one frame to exactly one arbitrarily-chosen connection under
    /// the topic. A user with several simultaneous connections gets the
    /// frame on only one of them.
    pub fn send_to_one(&self, topic: K, frame: Message) -> Result<(), RegistryError> {
        let topics = self.lock();
        let bucket = topics.get(&topic).ok_or(RegistryError::NoActiveConnection)?;
        let conn = bucket.values().next().ok_or(RegistryError::NoActiveConnection)?;
        conn.tx
            .send(frame)
            .map_err(|_| RegistryError::NoActiveConnection)
    }
}
