use axum::{middleware, Json, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::auth::refresh;
use crate::chat::{messages, settings};
use crate::notifications;
use crate::state::AppState;
use crate::ws::handshake;

/// Inject the token service into request extensions so the Claims
/// extractor can find it without knowing the state type.
async fn inject_token_service(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut().insert(state.tokens.clone());
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting on the token endpoint: 5 requests per minute per IP.
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>.
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5)
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    let auth_routes = Router::new()
        .route(
            "/api/auth/refresh",
            axum::routing::post(refresh::refresh_tokens),
        )
        .layer(GovernorLayer::new(governor_config));

    // WebSocket endpoints (auth via query params, not headers: browser
    // socket clients cannot send custom headers)
    let ws_routes = Router::new()
        .route(
            "/api/chats/{chat_id}/ws",
            axum::routing::get(handshake::chat_ws),
        )
        .route(
            "/api/notifications/ws",
            axum::routing::get(handshake::notifications_ws),
        );

    // Authenticated REST routes (Bearer token via the Claims extractor)
    let chat_routes = Router::new()
        .route(
            "/api/chats/{chat_id}/messages",
            axum::routing::post(messages::send_message),
        )
        .route(
            "/api/chats/{chat_id}/name",
            axum::routing::patch(settings::update_chat_name),
        )
        .route(
            "/api/chats/{chat_id}/active-users",
            axum::routing::get(settings::active_users),
        );
    let notification_routes = Router::new().route(
        "/api/users/{user_id}/notifications",
        axum::routing::post(notifications::create_notification),
    );

    let health = Router::new().route("/healthcheck", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(ws_routes)
        .merge(chat_routes)
        .merge(notification_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_token_service,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
