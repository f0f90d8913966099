use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "jan_kowalski")]
    pub username: String,
    /// Unique email address used to log in.
    #[schema(example = "jan@example.com")]
    pub email: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    validate_email(&payload.email)?;
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Shape check only: one `@`, non-empty local part, dotted domain.
fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = email.len() <= 254
        && !email.chars().any(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.split('.').count() >= 2
                    && domain.split('.').all(|label| !label.is_empty())
            }
            None => false,
        };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("Email address is invalid".into()))
    }
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jan@example.com")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Public profile of a user.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "jan_kowalski")]
    pub username: String,
    #[schema(example = "jan@example.com")]
    pub email: String,
}

impl From<crate::entity::user::Model> for UserResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    pub user: UserResponse,
}
