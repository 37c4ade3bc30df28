//! Account registration, sign-in and profile.

use axum::extract::State;
use axum::Json;
use euclid_common::models::{TokenResponse, UserLoginRequest, UserRegisterRequest, UserResponse, UserUpdateRequest};
use euclid_db::User;
use tracing::info;

use super::{validated, ApiJson};
use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, SharedState};

const TOKEN_TYPE: &str = "bearer";
const BAD_CREDENTIALS: &str = "Invalid email or password";

fn token_response(state: &AppState, user: &User) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(TokenResponse {
        access_token: state.tokens.issue(user)?,
        token_type: TOKEN_TYPE.to_string(),
        user: UserResponse::from(user),
    }))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<UserRegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let req = validated(req)?;
    let password_hash = hash_password(req.password).await?;
    let user = state.users.create(&req.email, password_hash, req.name).await?;
    info!(user_id = %user.id, "User registered");
    token_response(&state, &user)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<UserLoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let rejected = || ApiError::Unauthorized(BAD_CREDENTIALS.to_string());
    let user = state.users.find_by_email(&req.email).await?.filter(|u| u.is_active).ok_or_else(rejected)?;
    if !verify_password(req.password, user.password_hash.clone()).await {
        return Err(rejected());
    }
    info!(user_id = %user.id, "User logged in");
    token_response(&state, &user)
}

/// GET /api/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// PATCH /api/auth/me
pub async fn update_me(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<UserUpdateRequest>,
) -> ApiResult<Json<UserResponse>> {
    let req = validated(req)?;
    let updated = state.users.update_profile(&user.id, req.name, req.learning_level).await?;
    Ok(Json(UserResponse::from(&updated)))
}
