//! Access/refresh token pair issuance and validation.
//!
//! Both halves of a pair carry the same identity claims and differ only in
//! expiry. Refresh is stateless: a still-valid refresh token is sufficient
//! to mint a brand-new pair, and the old refresh token is not tracked or
//! revoked server-side.

use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::User;

/// Access tokens are short-lived (15 minutes).
const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh tokens live for 7 days.
const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// JWT claims: the user identity plus expiry.
/// Serializes flat: `{"id":1,"username":"…","email":"…","createdAt":"…","updatedAt":"…","exp":0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub user: User,
    pub exp: i64,
}

/// A freshly minted access + refresh token pair.
/// Also the body of the `POST /api/auth/refresh` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Why a token failed to parse. Only `Expired` is recoverable, by letting
/// the caller attempt a refresh; everything else is terminal for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token is expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            _ => TokenError::Malformed,
        }
    }
}

/// Issues and validates HS256-signed token pairs.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue an access token (15-minute expiry) for the given identity.
    pub fn new_access_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        self.sign(user, ACCESS_TOKEN_TTL_SECS)
    }

    /// Issue a refresh token (7-day expiry) for the given identity.
    pub fn new_refresh_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        self.sign(user, REFRESH_TOKEN_TTL_SECS)
    }

    /// Mint a matched access + refresh pair carrying the same identity.
    pub fn new_token_pair(&self, user: &User) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        Ok(TokenPair {
            access_token: self.new_access_token(user)?,
            refresh_token: self.new_refresh_token(user)?,
        })
    }

    /// Validate a token and return its claims. Expiry is checked here, at
    /// parse time, not at issue time.
    pub fn parse_token(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    fn sign(&self, user: &User, ttl_secs: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            user: user.clone(),
            exp: Utc::now().timestamp() + ttl_secs,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }
}

/// Load or generate the JWT signing key (256-bit random secret).
/// Stored as raw bytes in `<data_dir>/jwt_secret`.
pub fn load_or_generate_jwt_secret(data_dir: &str) -> std::io::Result<Vec<u8>> {
    let key_path = Path::new(data_dir).join("jwt_secret");

    if key_path.exists() {
        let key = std::fs::read(&key_path)?;
        if key.len() == 32 {
            tracing::info!("JWT signing key loaded from {}", key_path.display());
            return Ok(key);
        }
        // Invalid key file, regenerate
        tracing::warn!("JWT key file has wrong size ({}), regenerating", key.len());
    }

    std::fs::create_dir_all(data_dir)?;
    let key: [u8; 32] = rand::rng().random();
    std::fs::write(&key_path, key)?;
    tracing::info!("JWT signing key generated at {}", key_path.display());
    Ok(key.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn test_user() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn access_token_round_trips_identity() {
        let svc = TokenService::new(b"unit-test-secret");
        let user = test_user();
        let token = svc.new_access_token(&user).unwrap();
        let claims = svc.parse_token(&token).unwrap();
        assert_eq!(claims.user, user);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn minted_pair_carries_the_same_identity_in_both_halves() {
        let svc = TokenService::new(b"unit-test-secret");
        let user = test_user();
        let pair = svc.new_token_pair(&user).unwrap();
        let access = svc.parse_token(&pair.access_token).unwrap();
        let refresh = svc.parse_token(&pair.refresh_token).unwrap();
        assert_eq!(access.user, refresh.user);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn expired_token_fails_with_expired() {
        let svc = TokenService::new(b"unit-test-secret");
        // Backdate well past the default validation leeway.
        let claims = Claims {
            user: test_user(),
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();
        assert_eq!(svc.parse_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_with_another_secret_fails_with_signature_invalid() {
        let svc = TokenService::new(b"unit-test-secret");
        let other = TokenService::new(b"a-different-secret");
        let token = other.new_access_token(&test_user()).unwrap();
        assert_eq!(svc.parse_token(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn garbage_fails_with_malformed() {
        let svc = TokenService::new(b"unit-test-secret");
        assert_eq!(svc.parse_token("not-a-jwt"), Err(TokenError::Malformed));
    }

    #[test]
    fn jwt_secret_is_generated_once_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        let first = load_or_generate_jwt_secret(path).unwrap();
        let second = load_or_generate_jwt_secret(path).unwrap();
        assert_eq!(first.len(), 32);
        assert_eq!(first, second);
    }
}
