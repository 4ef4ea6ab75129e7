use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::{
    AppState,
    audit::{self, AuditContext, AuditEvent},
    auth::{self, AuthUser, MIN_PASSWORD_LEN},
    error::{ApiResult, api_internal, api_unauthorized, api_validation_error},
    models::{AuditAction, ChangePasswordRequest, LoginRequest, LoginResponse, UserProfile},
};

use super::entity;

const INVALID_LOGIN: &str = "invalid email or password";

pub(crate) fn require_password_strength(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(api_validation_error(&format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// login
///
/// [Public Route] Exchanges email and password for a signed JWT. Unknown emails,
/// wrong passwords and deactivated accounts all produce the same 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let Some(creds) = state.repo.get_credentials_by_email(&payload.email).await? else {
        auth::verify_dummy_password(&payload.password, state.config.bcrypt_cost).await;
        return Err(api_unauthorized(INVALID_LOGIN));
    };

    if !creds.is_active || !auth::verify_password(&payload.password, &creds.password_hash).await {
        tracing::info!(user_id = %creds.id, "rejected login attempt");
        return Err(api_unauthorized(INVALID_LOGIN));
    }

    state.repo.touch_last_login(creds.id, Utc::now()).await?;
    let user = state
        .repo
        .get_user(creds.id)
        .await?
        .ok_or_else(|| api_unauthorized(INVALID_LOGIN))?;

    let (token, expires_in) = auth::issue_token(&user, &state.config).map_err(|e| {
        tracing::error!(error = %e, "failed to sign token");
        api_internal("could not issue token")
    })?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Login, entity::USER)
            .entity(user.id)
            .actor(user.id)
            .context(&ctx),
    )
    .await;

    Ok(Json(LoginResponse {
        token,
        expires_in,
        user,
    }))
}

/// get_me
///
/// [Authenticated Route] The caller's profile, department and resolved
/// permission for every module.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current user profile", body = UserProfile))
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or_else(|| api_unauthorized("user no longer exists"))?;

    let department = match profile.department_id {
        Some(id) => state.repo.get_department(id).await?,
        None => None,
    };
    let permissions = state.permissions.permission_map(&user).await?;

    Ok(Json(UserProfile {
        user: profile,
        department,
        permissions,
    }))
}

/// change_password
///
/// [Authenticated Route] Requires the current password.
#[utoipa::path(
    put,
    path = "/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Weak password", body = crate::error::ErrorResponse),
        (status = 401, description = "Current password is wrong", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    require_password_strength(&payload.new_password)?;

    let creds = state
        .repo
        .get_credentials(user.id)
        .await?
        .ok_or_else(|| api_unauthorized("user no longer exists"))?;
    if !auth::verify_password(&payload.current_password, &creds.password_hash).await {
        return Err(api_unauthorized("current password is incorrect"));
    }

    let hash = auth::hash_password(&payload.new_password, state.config.bcrypt_cost)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            api_internal("could not update password")
        })?;
    state.repo.set_password(user.id, &hash).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::PasswordChange, entity::USER)
            .entity(user.id)
            .actor(user.id)
            .context(&ctx),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
