//! Authenticate-then-upgrade handshake for WebSocket endpoints.
//!
//! Browser socket clients cannot send custom headers, so both tokens ride
//! in query parameters. An expired access token is rotated transparently
//! when the refresh token still validates; the fresh pair is delivered as
//! the socket's first frame because no cookie can be set after the upgrade.
//! Any other auth failure rejects the request before the upgrade happens.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::auth::tokens::{TokenError, TokenPair, TokenService};
use crate::error::ApiError;
use crate::models::{ChatId, User};
use crate::state::AppState;
use crate::ws::connection;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Outcome of the pre-upgrade auth step: who the socket belongs to, and the
/// fresh pair to push as the first frame when rotation happened.
#[derive(Debug)]
pub struct SocketAuth {
    pub user: User,
    pub rotated: Option<TokenPair>,
}

/// Resolve the caller's identity from query-string tokens.
///
/// Only an `Expired` access token triggers the refresh path; every other
/// parse failure, and any refresh-token failure, is terminal: the caller
/// must re-authenticate with credentials rather than retry.
pub fn authenticate_socket(
    tokens: &TokenService,
    query: &SocketTokens,
) -> Result<SocketAuth, ApiError> {
    let access_token = query
        .access_token
        .as_deref()
        .ok_or_else(ApiError::unauthorized)?;

    match tokens.parse_token(access_token) {
        Ok(claims) => Ok(SocketAuth {
            user: claims.user,
            rotated: None,
        }),
        Err(TokenError::Expired) => {
            let refresh_token = query
                .refresh_token
                .as_deref()
                .ok_or_else(ApiError::unauthorized)?;
            let claims = tokens
                .parse_token(refresh_token)
                .map_err(|_| ApiError::unauthorized())?;
            let pair = tokens.new_token_pair(&claims.user).map_err(|err| {
                tracing::error!(error = %err, "failed to mint rotated token pair");
                ApiError::internal("failed to mint token pair")
            })?;
            Ok(SocketAuth {
                user: claims.user,
                rotated: Some(pair),
            })
        }
        Err(_) => Err(ApiError::unauthorized()),
    }
}

fn rotation_greeting(auth: &SocketAuth) -> Option<ServerEvent> {
    auth.rotated.as_ref().map(|pair| ServerEvent::UpdateAccessToken {
        access_token: pair.access_token.clone(),
        refresh_token: pair.refresh_token.clone(),
    })
}

/// GET /api/chats/{chat_id}/ws
pub async fn chat_ws(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    Query(query): Query<SocketTokens>,
    ws: WebSocketUpgrade,
) -> Response {
    let auth = match authenticate_socket(&state.tokens, &query) {
        Ok(auth) => auth,
        Err(err) => {
            tracing::warn!(chat_id, "websocket handshake rejected");
            return err.into_response();
        }
    };

    let registry = state.chats.registry();
    ws.on_upgrade(move |socket| {
        let greeting = rotation_greeting(&auth);
        connection::run(socket, registry, chat_id, auth.user.id, greeting)
    })
}

/// GET /api/notifications/ws. The topic is the caller's own user id.
pub async fn notifications_ws(
    State(state): State<AppState>,
    Query(query): Query<SocketTokens>,
    ws: WebSocketUpgrade,
) -> Response {
    let auth = match authenticate_socket(&state.tokens, &query) {
        Ok(auth) => auth,
        Err(err) => {
            tracing::warn!("notification socket handshake rejected");
            return err.into_response();
        }
    };

    let registry = state.notifications.registry();
    ws.on_upgrade(move |socket| {
        let greeting = rotation_greeting(&auth);
        connection::run(socket, registry, auth.user.id, auth.user.id, greeting)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::Claims;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"handshake-test-secret";

    fn test_user() -> User {
        User {
            id: 5,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn expired_token(user: &User) -> String {
        let claims = Claims {
            user: user.clone(),
            exp: Utc::now().timestamp() - 3600,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn valid_access_token_resolves_without_rotation() {
        let tokens = TokenService::new(SECRET);
        let user = test_user();
        let query = SocketTokens {
            access_token: Some(tokens.new_access_token(&user).unwrap()),
            refresh_token: None,
        };
        let auth = authenticate_socket(&tokens, &query).unwrap();
        assert_eq!(auth.user, user);
        assert!(auth.rotated.is_none());
    }

    #[test]
    fn missing_access_token_is_unauthorized() {
        let tokens = TokenService::new(SECRET);
        let err = authenticate_socket(&tokens, &SocketTokens::default()).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expired_access_with_valid_refresh_rotates_the_pair() {
        let tokens = TokenService::new(SECRET);
        let user = test_user();
        let query = SocketTokens {
            access_token: Some(expired_token(&user)),
            refresh_token: Some(tokens.new_refresh_token(&user).unwrap()),
        };
        let auth = authenticate_socket(&tokens, &query).unwrap();
        assert_eq!(auth.user, user);
        let pair = auth.rotated.expect("rotation expected");
        // The fresh access token must parse as non-expired with the same identity.
        let claims = tokens.parse_token(&pair.access_token).unwrap();
        assert_eq!(claims.user, user);
    }

    #[test]
    fn expired_access_with_expired_refresh_is_terminal() {
        let tokens = TokenService::new(SECRET);
        let user = test_user();
        let query = SocketTokens {
            access_token: Some(expired_token(&user)),
            refresh_token: Some(expired_token(&user)),
        };
        let err = authenticate_socket(&tokens, &query).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expired_access_with_missing_refresh_is_terminal() {
        let tokens = TokenService::new(SECRET);
        let user = test_user();
        let query = SocketTokens {
            access_token: Some(expired_token(&user)),
            refresh_token: None,
        };
        let err = authenticate_socket(&tokens, &query).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn garbage_access_token_does_not_reach_the_refresh_path() {
        let tokens = TokenService::new(SECRET);
        let user = test_user();
        let query = SocketTokens {
            access_token: Some("garbage".to_string()),
            refresh_token: Some(tokens.new_refresh_token(&user).unwrap()),
        };
        let err = authenticate_socket(&tokens, &query).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }
}
