// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::{AuthUser, Role, UserRow},
    state::AppState,
};

/// JWT Claims structure, as issued by the platform's auth service.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// User ID.
    pub id: Uuid,
    pub email: String,
    /// User's role ('USER', 'ADMIN' or 'SUPER_ADMIN').
    pub role: Role,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a new JWT for the user.
///
/// Tokens are normally issued by the platform; this exists for tooling and tests.
pub fn sign_jwt(
    id: Uuid,
    email: &str,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        id,
        email: email.to_owned(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Axum Middleware: Authentication.
///
/// Validates the bearer token, then confirms the user still exists with the
/// same role. On success an `AuthUser` is injected into the request extensions.
///
/// * Missing token: 401 "Token required".
/// * Bad or expired token: 401 "Invalid token".
/// * Unknown user: 403.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::AuthError("Token required".to_string()))?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    let user = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, role FROM users WHERE id = $1 AND role = $2",
    )
    .bind(claims.id)
    .bind(claims.role.as_str())
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load token user: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or_else(|| AppError::Forbidden("Invalid token, user not found".to_string()))?;

    let role = user
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Forbidden("Invalid token, user not found".to_string()))?;

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
        email: user.email,
        role,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let id = Uuid::new_v4();
        let token = sign_jwt(id, "a@example.com", Role::Admin, "secret", 60).unwrap();

        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.email, "a@example.com");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign_jwt(Uuid::new_v4(), "a@example.com", Role::User, "secret", 60).unwrap();
        let err = verify_jwt(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
