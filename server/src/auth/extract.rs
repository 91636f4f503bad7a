//! Axum extractor for JWT-authenticated REST handlers.
//!
//! The `TokenService` is injected into request extensions by a middleware
//! layer in `routes.rs`, so the extractor stays state-agnostic.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::tokens::{Claims, TokenService};
use crate::error::ApiError;

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(ApiError::unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(ApiError::unauthorized)?;

        let tokens = parts
            .extensions
            .get::<Arc<TokenService>>()
            .ok_or_else(|| ApiError::internal("token service not configured"))?;

        tokens
            .parse_token(token)
            .map_err(|_| ApiError::unauthorized())
    }
}
