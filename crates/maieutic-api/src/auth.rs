// Identity-store HTTP surface: register/login/logout as callable
// operations. The *middleware* that would resolve a bearer token on every request is out
// of scope (§1); `state::AuthedIdentity` is the thin stand-in that does exactly
// that resolution for the handlers below it.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use maieutic_contracts::error::CoreError;
use maieutic_contracts::{RefreshToken, User};
use maieutic_storage::password::{generate_refresh_token, hash_password, hash_token, verify_password};

use crate::error::ApiResult;
use crate::state::AppState;

const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 30;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub login_handle: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login_handle: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: User,
    /// Shown exactly once; only its hash is persisted (§7 error model has no path back to it).
    pub refresh_token: String,
    pub expires_at: chrono::DateTime<Utc>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/logout", post(logout))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Validation error")
    ),
    tag = "auth"
)]
pub async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> ApiResult<(StatusCode, Json<User>)> {
    if req.login_handle.trim().is_empty() || req.password.len() < 8 {
        return Err(CoreError::Validation(
            "login_handle must not be empty and password must be at least 8 characters".to_string(),
        )
        .into());
    }
    if state.identity_store.get_user_by_login_handle(&req.login_handle).await?.is_some() {
        return Err(CoreError::Validation("login_handle already registered".to_string()).into());
    }

    let password_hash = hash_password(&req.password).map_err(|e| CoreError::internal(anyhow::anyhow!(e)))?;
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        login_handle: req.login_handle,
        password_hash,
        is_admin: false,
        created_at: now,
        updated_at: now,
    };
    let stored = state.identity_store.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = LoginResponse),
        (status = 403, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .identity_store
        .get_user_by_login_handle(&req.login_handle)
        .await?
        .ok_or_else(|| CoreError::PermissionDenied("invalid login handle or password".to_string()))?;

    let valid = verify_password(&req.password, &user.password_hash).map_err(|e| CoreError::internal(anyhow::anyhow!(e)))?;
    if !valid {
        return Err(CoreError::PermissionDenied("invalid login handle or password".to_string()).into());
    }

    let generated = generate_refresh_token();
    let now = Utc::now();
    let expires_at = now + ChronoDuration::days(REFRESH_TOKEN_LIFETIME_DAYS);
    let token = RefreshToken {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash: generated.hash,
        created_at: now,
        expires_at,
        revoked_at: None,
    };
    state.identity_store.create_refresh_token(token).await?;

    Ok(Json(LoginResponse {
        user,
        refresh_token: generated.plaintext,
        expires_at,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 403, description = "Missing or invalid token")
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, headers: axum::http::HeaderMap) -> ApiResult<StatusCode> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CoreError::PermissionDenied("missing Authorization header".to_string()))?;
    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| CoreError::PermissionDenied("Authorization header must be a Bearer token".to_string()))?;

    let token_hash = hash_token(token);
    let stored = state
        .identity_store
        .get_refresh_token_by_hash(&token_hash)
        .await?
        .ok_or_else(|| CoreError::PermissionDenied("unknown token".to_string()))?;

    state.identity_store.revoke_refresh_token(stored.id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}
