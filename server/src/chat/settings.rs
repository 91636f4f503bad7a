//! REST endpoints for chat-level settings and presence queries.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::tokens::Claims;
use crate::error::ApiError;
use crate::models::{ChatId, UserId};
use crate::state::AppState;
use crate::ws::hub::HubError;
use crate::ws::registry::RegistryError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatNameRequest {
    pub new_name: String,
}

/// PATCH /api/chats/{chat_id}/name
pub async fn update_chat_name(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    _claims: Claims,
    Json(body): Json<UpdateChatNameRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = body.new_name.trim();
    if name.chars().count() < 6 || name.chars().count() > 32 {
        return Err(ApiError::bad_request(
            "chat name must be between 6 and 32 characters",
        ));
    }

    match state.chats.broadcast_new_chat_name(chat_id, name) {
        Ok(()) => {}
        Err(HubError::Registry(RegistryError::TopicNotRegistered)) => {
            tracing::debug!(chat_id, "no live connections for chat, rename broadcast skipped");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Json(json!({ "message": "chat name updated" })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUsersResponse {
    pub user_ids: Vec<UserId>,
}

/// GET /api/chats/{chat_id}/active-users
pub async fn active_users(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    _claims: Claims,
) -> Json<ActiveUsersResponse> {
    Json(ActiveUsersResponse {
        user_ids: state.chats.active_user_ids(chat_id),
    })
}
