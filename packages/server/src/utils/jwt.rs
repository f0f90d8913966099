use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    pub exp: usize,  // Expiration timestamp
}

/// Sign a new JWT token for a user, valid for `ttl_hours`.
pub fn sign(user_id: i32, username: &str, secret: &str, ttl_hours: i64) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| anyhow!("token expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        exp: expiration.max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
