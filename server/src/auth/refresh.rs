//! Explicit token-rotation endpoint for HTTP clients.
//!
//! A valid refresh token alone mints a brand-new access + refresh pair;
//! the old refresh token keeps working until its own expiry. WebSocket
//! clients get the same rotation transparently during the handshake.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::auth::tokens::TokenPair;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /api/auth/refresh
pub async fn refresh_tokens(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let claims = state
        .tokens
        .parse_token(&body.refresh_token)
        .map_err(|err| {
            tracing::debug!(error = %err, "refresh token rejected");
            ApiError::unauthorized()
        })?;

    let pair = state.tokens.new_token_pair(&claims.user).map_err(|err| {
        tracing::error!(error = %err, "failed to mint token pair");
        ApiError::internal("failed to mint token pair")
    })?;

    Ok(Json(pair))
}
