//! Collaborator-facing hub APIs over the two registry instances.
//!
//! The hubs own the registries; REST handlers and the socket runtime go
//! through these methods and never touch registry state directly. Each
//! broadcast serializes its event once and hands the frame to the registry.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{ChatId, MessageWithUser, Notification, UserId};
use crate::ws::protocol::ServerEvent;
use crate::ws::registry::{ConnectionId, ConnectionRegistry, ConnectionSender, RegistryError};

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to encode outbound frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Chat-scoped hub: connections are bucketed by the chat they joined.
pub struct ChatHub {
    registry: Arc<ConnectionRegistry<ChatId>>,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHub {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    pub(crate) fn registry(&self) -> Arc<ConnectionRegistry<ChatId>> {
        self.registry.clone()
    }

    pub fn add_chat_conn(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        tx: ConnectionSender,
    ) -> ConnectionId {
        self.registry.add(chat_id, user_id, tx)
    }

    /// Close and deregister one chat connection. `NotFound` is benign: the
    /// connection may already have torn itself down.
    pub fn close_conn(&self, chat_id: ChatId, conn_id: ConnectionId) -> Result<(), RegistryError> {
        self.registry.remove(chat_id, conn_id)
    }

    /// Snapshot of user ids with at least one live connection to the chat.
    pub fn active_user_ids(&self, chat_id: ChatId) -> Vec<UserId> {
        self.registry.active_user_ids(chat_id)
    }

    pub fn broadcast_new_message(
        &self,
        chat_id: ChatId,
        message: MessageWithUser,
    ) -> Result<(), HubError> {
        let frame = ServerEvent::NewMessage { message }.to_message()?;
        Ok(self.registry.broadcast(chat_id, frame)?)
    }

    pub fn broadcast_new_chat_name(&self, chat_id: ChatId, new_name: &str) -> Result<(), HubError> {
        let frame = ServerEvent::ChatNameUpdated {
            new_name: new_name.to_string(),
        }
        .to_message()?;
        Ok(self.registry.broadcast(chat_id, frame)?)
    }
}

/// User-scoped hub for notification sockets.
pub struct NotificationHub {
    registry: Arc<ConnectionRegistry<UserId>>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    pub(crate) fn registry(&self) -> Arc<ConnectionRegistry<UserId>> {
        self.registry.clone()
    }

    pub fn add_conn(&self, user_id: UserId, tx: ConnectionSender) -> ConnectionId {
        self.registry.add(user_id, user_id, tx)
    }

    pub fn remove_conn(&self, user_id: UserId, conn_id: ConnectionId) -> Result<(), RegistryError> {
        self.registry.remove(user_id, conn_id)
    }

    /// Push a notification to one of the user's live connections.
    ///
    /// Single delivery is intentional: with several simultaneous
    /// connections only one receives the push. On `NoActiveConnection` the
    /// REST caller is responsible for persisting the notification for later
    /// retrieval.
    pub fn send_notification(
        &self,
        user_id: UserId,
        notification: &Notification,
    ) -> Result<(), HubError> {
        let frame =
            axum::extract::ws::Message::Text(serde_json::to_string(notification)?.into());
        Ok(self.registry.send_to_one(user_id, frame)?)
    }
}
