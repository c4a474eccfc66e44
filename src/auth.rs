use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::User,
    repository::UserRepositoryState,
};

/// Claims
///
/// Payload of the HS256 access tokens issued by `POST /auth/jwt/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a string per the JWT convention.
    pub sub: String,
    /// Expiration time (unix seconds). Always validated.
    pub exp: usize,
    /// Issued at (unix seconds).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request: who is calling and whether
/// they hold the superuser role. Handlers take it as an argument; its presence
/// guarantees the caller exists and is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub is_superuser: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            is_superuser: user.is_superuser,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 0. Reuse: an identity already stored in the request extensions is returned as is.
/// 1. Local bypass: in `Env::Local` an `x-user-id: <id>` header is accepted.
/// 2. Bearer token extraction and JWT validation (signature + expiry).
/// 3. User lookup: the account must still exist and be active.
///
/// Rejection: `ApiError::Unauthorized` (401) for any credential problem.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    UserRepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the router's auth layer.
        if let Some(resolved) = parts.extensions.get::<AuthUser>() {
            return Ok(*resolved);
        }

        let users = UserRepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.trim().parse::<i64>().ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = users.get(user_id).await? {
                    if user.is_active {
                        tracing::debug!(user_id, "authenticated via x-user-id bypass");
                        return Ok(AuthUser::from(&user));
                    }
                }
            }
        }
        // Production, or a failed bypass: fall through to the token flow.

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let claims = validate_token(token.trim(), &config.jwt_secret)?;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("malformed token subject".to_string()))?;

        let user = users
            .get(user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| ApiError::Unauthorized("unknown or inactive user".to_string()))?;

        Ok(AuthUser::from(&user))
    }
}

/// Signs an access token for `user_id` that expires after `lifetime_secs`.
pub fn issue_token(user_id: i64, secret: &str, lifetime_secs: u64) -> Result<String, ApiError> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + lifetime_secs as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

/// Decodes and validates a token, returning its claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::Unauthorized("token expired".to_string()),
        _ => {
            tracing::debug!(error = %e, "token validation failed");
            ApiError::Unauthorized("invalid token".to_string())
        }
    })
}

/// Hashes a password with Argon2id, returning a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

/// Checks a password against a PHC-format hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
