//! HTTP-facing error type. Hub-internal taxonomies (`TokenError`,
//! `RegistryError`) live next to the components that produce them; this
//! type is the translation layer to an axum response with a JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::ws::hub::HubError;
use crate::ws::registry::RegistryError;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Unauthorized".to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => ApiError::not_found("connection not found"),
            RegistryError::TopicNotRegistered => ApiError::not_found("no connections for topic"),
            RegistryError::NoActiveConnection => ApiError::not_found("no active connection"),
        }
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Registry(e) => e.into(),
            HubError::Encode(e) => {
                tracing::error!(error = %e, "failed to encode outbound frame");
                ApiError::internal("failed to encode outbound frame")
            }
        }
    }
}
