use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::*;
use crate::state::AppState;
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a new user",
    description = "Creates an account. Usernames and emails are unique; emails are compared case-insensitively.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Username or email taken (USERNAME_TAKEN, EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let username = payload.username.trim().to_string();
    let email = normalize_email(&payload.email);

    if user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::UsernameTaken);
    }
    if user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::EmailTaken);
    }

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password: Set(hash),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            if detail.contains("email") {
                AppError::EmailTaken
            } else {
                AppError::UsernameTaken
            }
        }
        _ => AppError::from(e),
    })?;

    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in with email and password",
    description = "Returns a JWT bearer token valid for `auth.token_ttl_hours` (7 days by default).",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(&payload.email)))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let token = jwt::sign(
        user.id,
        &user.username,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get the current user",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Account no longer exists (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(user.into()))
}
