//! REST endpoint for pushing a notification to a user's live socket.
//!
//! Delivery goes to exactly one of the user's active connections. When the
//! user has none, this layer answers 202 and leaves persisting the
//! notification for later retrieval to the store collaborator.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::tokens::Claims;
use crate::error::ApiError;
use crate::models::{Notification, NotificationKind, UserId};
use crate::state::AppState;
use crate::ws::hub::HubError;
use crate::ws::registry::RegistryError;

/// Request body is the notification kind in its wire shape, e.g.
/// `{"type":"friend_request","data":{"message":"…"}}` or
/// `{"type":"new_message","data":{"chatId":42}}`.
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    #[serde(flatten)]
    pub kind: NotificationKind,
}

/// POST /api/users/{user_id}/notifications
pub async fn create_notification(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    _claims: Claims,
    Json(body): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    if let NotificationKind::FriendRequest(data) = &body.kind {
        if data.message.trim().is_empty() {
            return Err(ApiError::bad_request("notification message must not be empty"));
        }
    }

    let notification = Notification::new(user_id, body.kind);

    match state.notifications.send_notification(user_id, &notification) {
        Ok(()) => Ok((StatusCode::CREATED, Json(notification))),
        Err(HubError::Registry(RegistryError::NoActiveConnection)) => {
            tracing::info!(user_id, "user has no active connection, notification not pushed");
            Ok((StatusCode::ACCEPTED, Json(notification)))
        }
        Err(err) => Err(err.into()),
    }
}
