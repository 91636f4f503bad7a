//! REST endpoint for posting a message to a chat.
//!
//! Durable message storage and chat-membership checks belong to the store
//! collaborator; this handler builds the enriched message from the
//! authenticated identity and fans it out to the chat's live sockets.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::tokens::Claims;
use crate::error::ApiError;
use crate::models::{ChatId, Message, MessageWithUser};
use crate::state::AppState;
use crate::ws::hub::HubError;
use crate::ws::registry::RegistryError;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// POST /api/chats/{chat_id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    claims: Claims,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageWithUser>), ApiError> {
    if body.text.trim().is_empty() {
        return Err(ApiError::bad_request("message text must not be empty"));
    }

    let message = MessageWithUser {
        message: Message {
            id: Uuid::new_v4(),
            chat_id,
            text: body.text,
            created_at: Utc::now(),
        },
        user: claims.user,
    };

    match state.chats.broadcast_new_message(chat_id, message.clone()) {
        Ok(()) => {}
        Err(HubError::Registry(RegistryError::TopicNotRegistered)) => {
            // Nobody has ever opened a socket to this chat; the message is
            // still created, there is just no one to push it to.
            tracing::debug!(chat_id, "no live connections for chat, broadcast skipped");
        }
        Err(err) => return Err(err.into()),
    }

    Ok((StatusCode::CREATED, Json(message)))
}
