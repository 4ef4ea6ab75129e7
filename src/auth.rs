use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::{Role, User},
    repository::RepositoryState,
};

/// Minimum accepted length for any new password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Claims
///
/// Payload signed into every JSON Web Token issued by `POST /auth/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID. The user row is re-read on every request, so
    /// role or activation changes take effect before the token expires.
    pub sub: Uuid,
    /// Role at issue time; informational only.
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers use it for role
/// checks, department permission lookups and audit attribution.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            department_id: user.department_id,
        }
    }
}

/// issue_token
///
/// Signs an HS256 token for `user` valid for `config.jwt_expiry_hours`.
/// Returns the token and its lifetime in seconds.
pub fn issue_token(
    user: &User,
    config: &AppConfig,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let lifetime = Duration::hours(config.jwt_expiry_hours.max(1));
    let claims = Claims {
        sub: user.id,
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + lifetime).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok((token, lifetime.num_seconds()))
}

/// Decodes and validates a bearer token (signature and expiry).
pub fn decode_token(token: &str, config: &AppConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// hash_password
///
/// bcrypt is CPU-bound, so hashing runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Returns `false` for a mismatch or an unreadable hash.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "stored password hash could not be verified");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "password verification task failed");
            false
        }
    }
}

static DUMMY_HASH: tokio::sync::OnceCell<Option<String>> = tokio::sync::OnceCell::const_new();

/// verify_dummy_password
///
/// Verifies `password` against a fixed hash of an account that does not exist,
/// so an unknown email costs the same bcrypt work as a wrong password. Always
/// `false`.
pub async fn verify_dummy_password(password: &str, cost: u32) -> bool {
    let hash = DUMMY_HASH
        .get_or_init(|| async move {
            hash_password("no-such-account", cost)
                .await
                .map_err(|e| tracing::warn!(error = %e, "could not prepare dummy password hash"))
                .ok()
        })
        .await;
    if let Some(hash) = hash {
        verify_password(password, hash).await;
    }
    false
}

/// AuthUser Extractor Implementation
///
/// 0. A user already resolved by the authentication middleware is reused.
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing
///    user authenticates the request.
/// 2. Otherwise `Authorization: Bearer <jwt>` is decoded and validated.
/// 3. The user is re-read from the store; unknown or deactivated users are rejected.
///
/// Rejection: `StatusCode::UNAUTHORIZED` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<AuthUser>() {
            return Ok(resolved.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());
            if let Some(user_id) = bypass_id {
                if let Ok(Some(user)) = repo.get_user(user_id).await {
                    if user.is_active {
                        return Ok(user.into());
                    }
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = decode_token(token, &config).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            StatusCode::UNAUTHORIZED
        })?;

        let user = repo
            .get_user(claims.sub)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "user lookup failed during authentication");
                StatusCode::UNAUTHORIZED
            })?
            .filter(|user| user.is_active)
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(user.into())
    }
}
