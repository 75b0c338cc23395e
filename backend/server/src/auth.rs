//! # Authentication
//!
//! Passwords are stored as argon2id PHC strings, so the salt and cost
//! parameters travel with each hash and verification needs no configuration.
//!
//! Tokens are HS256 JWTs carrying [`Claims`]. The [`authenticate`] middleware
//! verifies them and stores the claims in the request extensions, where
//! handlers pick them up with `Extension<Claims>`.
use std::{sync::Arc, time::Duration};

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, get_current_timestamp};
use payloads::{Claims, Role};
use tracing::debug;

use crate::{error::AppError, state::AppState};

pub const MISSING_TOKEN: &str = "Access denied. No token provided.";
pub const INVALID_TOKEN: &str = "Invalid or expired token.";

pub fn hash_password(password: &str, memory_kib: u32) -> Result<String, AppError> {
    let params = Params::new(
        memory_kib,
        Params::DEFAULT_T_COST,
        Params::DEFAULT_P_COST,
        None,
    )
    .map_err(|e| AppError::Internal(format!("argon2 params: {e}")))?;

    let salt = SaltString::generate(&mut OsRng);

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| AppError::Internal(format!("stored password hash unreadable: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_token(
    user_id: &str,
    role: Role,
    secret: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    let iat = get_current_timestamp();
    let claims = Claims {
        user_id: user_id.to_string(),
        role,
        iat,
        exp: iat + ttl.as_secs(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Checks signature and expiry.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected token: {e}");
        AppError::Unauthorized(INVALID_TOKEN.to_string())
    })
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized(MISSING_TOKEN.to_string()))?;

    let claims = decode_token(token, &state.config.jwt_secret)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Must run after [`authenticate`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let role = request
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.role)
        .ok_or_else(|| AppError::Unauthorized(MISSING_TOKEN.to_string()))?;

    if role != Role::Admin {
        return Err(AppError::Forbidden(
            "Administrator access required.".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
