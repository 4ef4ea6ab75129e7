use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    audit::{self, AuditContext, AuditEvent},
    auth::{self, AuthUser},
    error::{ApiResult, api_forbidden, api_internal, api_not_found, api_validation_error},
    models::{
        AuditAction, CreateUserRequest, Module, Page, ResetPasswordRequest, Role,
        UpdateUserRequest, User, UserFilter,
    },
    permissions::{Action, require_role},
    repository::NewUser,
};

use super::{auth::require_password_strength, entity, require_text, require_text_if_present};

fn require_email(email: &str) -> ApiResult<()> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.contains(char::is_whitespace);
    if !valid {
        return Err(api_validation_error("email is not a valid address"));
    }
    Ok(())
}

async fn hash(state: &AppState, password: &str) -> ApiResult<String> {
    auth::hash_password(password, state.config.bcrypt_cost)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            api_internal("could not hash password")
        })
}

#[utoipa::path(
    get,
    path = "/users",
    params(UserFilter),
    responses((status = 200, description = "Paginated users", body = Page<User>))
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<Page<User>>> {
    state.permissions.require(&user, Module::Users, Action::Read).await?;
    Ok(Json(state.repo.list_users(filter).await?))
}

/// get_user
///
/// [Authenticated Route] Deactivated users are still returned so they can be
/// reactivated through `PUT /users/{id}`.
#[utoipa::path(
    get,
    path = "/users/{id}",
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    state.permissions.require(&user, Module::Users, Action::Read).await?;
    let found = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| api_not_found("user not found"))?;
    Ok(Json(found))
}

/// create_user
///
/// [Authenticated Route] Only an ADMIN may create another ADMIN.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    state.permissions.require(&user, Module::Users, Action::Write).await?;
    require_email(&payload.email)?;
    require_text("name", &payload.name)?;
    require_password_strength(&payload.password)?;
    if payload.role == Role::Admin {
        require_role(&user, &[Role::Admin])?;
    }

    let password_hash = hash(&state, &payload.password).await?;
    let created = state
        .repo
        .create_user(NewUser {
            email: payload.email,
            name: payload.name,
            password_hash,
            role: payload.role,
            department_id: payload.department_id,
        })
        .await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Create, entity::USER)
            .entity(created.id)
            .actor(user.id)
            .new_values(&created)
            .context(&ctx),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}

/// update_user
///
/// [Authenticated Route] Non-admins can neither grant ADMIN nor modify an
/// existing ADMIN account, and cannot move themselves to another role or
/// department.
#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    state.permissions.require(&user, Module::Users, Action::Write).await?;
    require_text_if_present("name", payload.name.as_deref())?;

    let old = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| api_not_found("user not found"))?;
    if user.role != Role::Admin && (old.role == Role::Admin || payload.role == Some(Role::Admin)) {
        return Err(api_forbidden("only administrators may manage administrator accounts"));
    }
    if id == user.id
        && user.role != Role::Admin
        && (payload.role.is_some() || payload.department_id.is_some())
    {
        return Err(api_forbidden("you cannot change your own role or department"));
    }
    if id == user.id && payload.is_active == Some(false) {
        return Err(api_validation_error("you cannot deactivate your own account"));
    }

    let updated = state.repo.update_user(id, payload).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Update, entity::USER)
            .entity(id)
            .actor(user.id)
            .old(&old)
            .new_values(&updated)
            .context(&ctx),
    )
    .await;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    responses(
        (status = 204, description = "Deactivated"),
        (status = 400, description = "Cannot delete yourself", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.permissions.require(&user, Module::Users, Action::Delete).await?;
    if id == user.id {
        return Err(api_validation_error("you cannot delete your own account"));
    }
    if user.role != Role::Admin {
        if let Some(target) = state.repo.get_user(id).await? {
            if target.role == Role::Admin {
                return Err(api_forbidden(
                    "only administrators may manage administrator accounts",
                ));
            }
        }
    }

    let removed = state.repo.deactivate_user(id).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Delete, entity::USER)
            .entity(id)
            .actor(user.id)
            .old(&removed)
            .context(&ctx),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// reset_password
///
/// [Admin Route] Sets a new password without knowing the old one.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password reset"),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset_password(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<StatusCode> {
    require_role(&user, &[Role::Admin])?;
    require_password_strength(&payload.new_password)?;

    let password_hash = hash(&state, &payload.new_password).await?;
    state.repo.set_password(id, &password_hash).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::PasswordReset, entity::USER)
            .entity(id)
            .actor(user.id)
            .context(&ctx),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_checked() {
        assert!(require_email("ops@example.com").is_ok());
        assert!(require_email("ops@localhost").is_err());
        assert!(require_email("@example.com").is_err());
        assert!(require_email("o ps@example.com").is_err());
    }
}
