//! Account credentials: argon2 password hashes and HMAC-signed bearer tokens.
//!
//! Tokens use the compact JWS layout (`header.payload.signature`, base64url
//! without padding, HS256) so standard tooling can inspect them.

use std::time::Duration;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use euclid_common::config::AuthConfig;
use euclid_db::User;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const BEARER: &str = "Bearer ";

/// Hash on the blocking pool.
pub async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|e| ApiError::Internal(format!("salt: {e}")))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("password hash: {e}")))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// False for a wrong password and for an unparseable stored hash.
pub async fn verify_password(password: String, stored: String) -> bool {
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&stored)
            .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
            .unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    /// Unix seconds.
    pub exp: i64,
}

pub struct TokenSigner {
    key: SecretString,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(key: SecretString, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    pub fn from_settings(auth: &AuthConfig) -> Self {
        let key = match &auth.token_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("No auth.token_secret configured; tokens will not survive a restart");
                SecretString::from(URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>()))
            }
        };
        Self::new(key, auth.token_ttl())
    }

    fn mac(&self) -> ApiResult<HmacSha256> {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| ApiError::Internal(format!("token key: {e}")))
    }

    pub fn issue(&self, user: &User) -> ApiResult<String> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(24));
        let claims = Claims { sub: user.id.clone(), email: user.email.clone(), exp: (Utc::now() + ttl).timestamp() };
        let payload = serde_json::to_vec(&claims).map_err(|e| ApiError::Internal(e.to_string()))?;
        let signing_input = format!("{}.{}", URL_SAFE_NO_PAD.encode(TOKEN_HEADER), URL_SAFE_NO_PAD.encode(payload));

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Claims of a well-formed, correctly signed, unexpired token.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let (signing_input, signature) = token.rsplit_once('.')?;
        let (_, payload) = signing_input.split_once('.')?;
        if payload.contains('.') {
            return None;
        }
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
        (claims.exp > Utc::now().timestamp()).then_some(claims)
    }
}

async fn user_from_parts(parts: &Parts, state: &SharedState) -> ApiResult<User> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;
    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(BEARER))
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))?;
    let expired = || ApiError::Unauthorized("Invalid or expired token".to_string());
    let claims = state.tokens.verify(token.trim()).ok_or_else(expired)?;
    state
        .users
        .find_by_id(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(expired)
}

/// The signed-in user; rejects with 401 otherwise.
pub struct CurrentUser(pub User);

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        user_from_parts(parts, state).await.map(CurrentUser)
    }
}

/// The signed-in user if a valid token is present. Anonymous otherwise.
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.id.as_str())
    }
}

impl FromRequestParts<SharedState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(user_from_parts(parts, state).await.ok()))
    }
}
