use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. Ownership and
/// authorship checks happen in the handler or service against `user_id`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
}

impl AuthUser {
    /// Returns `Ok(())` if the user is `owner_id`, `Err(PermissionDenied)` otherwise.
    pub fn require_self(&self, owner_id: i32) -> Result<(), AppError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::TokenMissing)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::TokenInvalid)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
        })
    }
}

/// Like [`AuthUser`] but never rejects: anonymous requests, and requests
/// carrying an unusable token, get `None`.
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(
            AuthUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}
