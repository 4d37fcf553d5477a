// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

pub const ADMIN_ROLE: &str = "admin";

/// Bearer token payload.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// The admin username.
    pub sub: String,
    pub role: String,
    /// Unix timestamp (seconds).
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: &str, role: &str, ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self {
            sub: subject.to_owned(),
            role: role.to_owned(),
            exp: Utc::now().timestamp().saturating_add(ttl),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Signs a token for `subject` valid for `ttl_secs`.
pub fn sign_jwt(subject: &str, role: &str, secret: &str, ttl_secs: u64) -> Result<String, AppError> {
    let claims = Claims::new(subject, role, ttl_secs);

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Failed to sign token: {}", e)))
}

/// Decodes a token, rejecting bad signatures and expired claims.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AppError::AuthError("Invalid or expired token".to_string())
        })
}

/// Guards the admin routes.
///
/// No usable bearer token is a 401; a valid token for another role is a 403.
/// Accepted claims are left in the request extensions.
pub async fn admin_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::AuthError("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &config.jwt_secret)?;

    if !claims.is_admin() {
        tracing::warn!("Non-admin token presented by: {}", claims.sub);
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
