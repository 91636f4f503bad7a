//! Wire-level data model shared by the REST handlers and the WebSocket hub.
//! JSON field names are camelCase to match the client contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chat ids and user ids are the registry topic keys.
pub type ChatId = i64;
pub type UserId = i64;

/// Public identity of a user as carried in token claims and message payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single chat message. The id is minted when the message is created;
/// durable storage belongs to the store collaborator, not the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A message enriched with its author, the shape broadcast to chat sockets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageWithUser {
    #[serde(flatten)]
    pub message: Message,
    pub user: User,
}

/// Notification pushed over a user's notification socket.
/// Serializes with its own `type` tag, e.g.
/// `{"type":"friend_request","id":…,"userId":…,"seen":false,"data":{…}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: UserId,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationKind {
    FriendRequest(FriendRequestData),
    NewMessage(NewMessageData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequestData {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageData {
    pub chat_id: ChatId,
}

impl Notification {
    pub fn new(user_id: UserId, kind: NotificationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            seen: false,
            created_at: Utc::now(),
            kind,
        }
    }
}
