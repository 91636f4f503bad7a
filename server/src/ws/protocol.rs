//! Outbound WebSocket frame protocol.
//!
//! Every frame is a JSON object dispatched on its `type` field. The enum is
//! closed: adding a variant is a compile-time-checked, additive-only change;
//! clients ignore types they do not know. There is no schema version field,
//! so reshaping an existing payload is a breaking change.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::models::MessageWithUser;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A message was posted to a chat the client is connected to.
    #[serde(rename = "new-message")]
    NewMessage { message: MessageWithUser },

    /// The chat was renamed.
    #[serde(rename = "chat-name-updated", rename_all = "camelCase")]
    ChatNameUpdated { new_name: String },

    /// Credentials were rotated during the handshake. Always the first
    /// frame on the socket when present: the server cannot set cookies
    /// after the protocol upgrade, so this is the only channel left to
    /// hand the client its new token pair.
    #[serde(rename = "update-access-token", rename_all = "camelCase")]
    UpdateAccessToken {
        access_token: String,
        refresh_token: String,
    },
}

impl ServerEvent {
    /// Serialize into a text frame. Broadcast paths call this once and
    /// clone the cheap byte handle per socket.
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        Ok(Message::Text(serde_json::to_string(self)?.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message as ChatMessage, User};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn new_message_frame_shape() {
        let event = ServerEvent::NewMessage {
            message: MessageWithUser {
                message: ChatMessage {
                    id: Uuid::new_v4(),
                    chat_id: 42,
                    text: "hi".to_string(),
                    created_at: Utc::now(),
                },
                user: User {
                    id: 1,
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "new-message");
        assert_eq!(value["message"]["text"], "hi");
        assert_eq!(value["message"]["user"]["id"], 1);
    }

    #[test]
    fn chat_name_updated_frame_shape() {
        let event = ServerEvent::ChatNameUpdated {
            new_name: "weekend plans".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "chat-name-updated");
        assert_eq!(value["newName"], "weekend plans");
    }

    #[test]
    fn update_access_token_frame_shape() {
        let event = ServerEvent::UpdateAccessToken {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "update-access-token");
        assert_eq!(value["accessToken"], "a");
        assert_eq!(value["refreshToken"], "r");
    }
}
