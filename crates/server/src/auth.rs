//! Bearer-token extractors for the two principal kinds. A user token on
//! an admin route (and vice versa) is rejected as forbidden rather than
//! unauthenticated; the token itself was valid.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use jansetu_core::domain::identity::{AdminId, AdminRole, AuthPrincipal, UserId};

use crate::bootstrap::AppState;
use crate::error::ApiError;

pub struct AuthenticatedUser {
    pub user_id: UserId,
}

pub struct AuthenticatedAdmin {
    pub admin_id: AdminId,
    pub role: AdminRole,
}

fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthenticated("access denied; no token provided"))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthenticated("access denied; malformed authorization header"))?;
    value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthenticated("access denied; bearer token required"))
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        match state.identity.authenticate(&token).await? {
            AuthPrincipal::User(user_id) => Ok(Self { user_id }),
            AuthPrincipal::Admin { .. } => {
                Err(ApiError::forbidden("a user token is required for this resource"))
            }
        }
    }
}

impl FromRequestParts<AppState> for AuthenticatedAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        match state.identity.authenticate(&token).await? {
            AuthPrincipal::Admin { id, role } => Ok(Self { admin_id: id, role }),
            AuthPrincipal::User(_) => {
                Err(ApiError::forbidden("an admin token is required for this resource"))
            }
        }
    }
}
