// Shared application state and the identity extractor (§1: "the HTTP/CLI frontends and
// authentication layer are treated as a caller that already resolved a user identity" -
// this is that caller, the thinnest layer that can resolve a bearer token into one).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::Utc;

use maieutic_contracts::error::CoreError;
use maieutic_contracts::Identity;
use maieutic_core::config::CoreConfig;
use maieutic_core::orchestrator::Orchestrator;
use maieutic_core::store::{IdentityStore, WorkStore};
use maieutic_storage::password::hash_token;

use crate::error::ApiError;

pub struct SharedState {
    pub orchestrator: Orchestrator,
    pub work_store: Arc<dyn WorkStore>,
    pub identity_store: Arc<dyn IdentityStore>,
    pub config: Arc<CoreConfig>,
    pub route_deadline: Duration,
}

pub type AppState = Arc<SharedState>;

/// A request's resolved caller identity, extracted from an `Authorization: Bearer <refresh
/// token>` header. Everything below this point in the call stack (orchestrator, agents,
/// engines) only ever sees the resulting `Identity` - never the raw header (§1, §4.8).
pub struct AuthedIdentity(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthedIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError(CoreError::PermissionDenied("missing Authorization header".to_string())))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError(CoreError::PermissionDenied("Authorization header must be a Bearer token".to_string())))?;

        let token_hash = hash_token(token);
        let stored = state
            .identity_store
            .get_refresh_token_by_hash(&token_hash)
            .await?
            .ok_or_else(|| ApiError(CoreError::PermissionDenied("unknown or revoked token".to_string())))?;

        if stored.revoked_at.is_some() || stored.expires_at <= Utc::now() {
            return Err(ApiError(CoreError::PermissionDenied("token expired or revoked".to_string())));
        }

        let user = state
            .identity_store
            .get_user(stored.user_id)
            .await?
            .ok_or(CoreError::UnknownUser(stored.user_id))?;

        Ok(AuthedIdentity(Identity::new(user.id, user.is_admin)))
    }
}
