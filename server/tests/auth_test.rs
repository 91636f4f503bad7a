//! Integration tests for token issuance, the refresh endpoint, and the
//! Bearer-token guard on REST routes.

use std::net::SocketAddr;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tokio::net::TcpListener;

use parley_server::auth::tokens::{Claims, TokenService};
use parley_server::models::User;
use parley_server::routes;
use parley_server::state::AppState;

const SECRET: &[u8] = b"auth-integration-test-secret";

fn test_user(id: i64) -> User {
    User {
        id,
        username: format!("user-{id}"),
        email: format!("user-{id}@example.com"),
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

/// Start the server on a random port and return (base_url, state).
async fn start_test_server() -> (String, AppState) {
    let state = AppState::new(TokenService::new(SECRET));
    let app = routes::build_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (format!("http://{}", addr), state)
}

#[tokio::test]
async fn refresh_with_valid_refresh_token_mints_a_fresh_pair() {
    let (base_url, state) = start_test_server().await;
    let user = test_user(1);
    let refresh_token = state.tokens.new_refresh_token(&user).unwrap();

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/api/auth/refresh"))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    let access = body["accessToken"].as_str().unwrap();
    let refresh = body["refreshToken"].as_str().unwrap();

    // Both halves of the pair carry the caller's identity.
    let access_claims = state.tokens.parse_token(access).unwrap();
    let refresh_claims = state.tokens.parse_token(refresh).unwrap();
    assert_eq!(access_claims.user, user);
    assert_eq!(refresh_claims.user, user);
}

#[tokio::test]
async fn refresh_with_expired_refresh_token_is_unauthorized() {
    let (base_url, _state) = start_test_server().await;
    let user = test_user(2);

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/api/auth/refresh"))
        .json(&json!({ "refreshToken": expired_token(&user) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_with_garbage_token_is_unauthorized() {
    let (base_url, _state) = start_test_server().await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/api/auth/refresh"))
        .json(&json!({ "refreshToken": "not-a-jwt" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rest_routes_require_a_valid_bearer_token() {
    let (base_url, state) = start_test_server().await;
    let user = test_user(3);
    let client = reqwest::Client::new();

    // No Authorization header
    let resp = client
        .post(format!("{base_url}/api/chats/1/messages"))
        .json(&json!({ "text": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Expired bearer token
    let resp = client
        .post(format!("{base_url}/api/chats/1/messages"))
        .bearer_auth(expired_token(&user))
        .json(&json!({ "text": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Valid bearer token: message is created even with no sockets to push to
    let access_token = state.tokens.new_access_token(&user).unwrap();
    let resp = client
        .post(format!("{base_url}/api/chats/1/messages"))
        .bearer_auth(&access_token)
        .json(&json!({ "text": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["text"], "hello");
    assert_eq!(body["user"]["id"], 3);
}

#[tokio::test]
async fn healthcheck_is_public() {
    let (base_url, _state) = start_test_server().await;
    let resp = reqwest::get(format!("{base_url}/healthcheck")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
