use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    audit::{self, AuditContext, AuditEvent},
    auth::AuthUser,
    error::{ApiResult, api_not_found, api_validation_error},
    models::{
        AuditAction, CreateDepartmentRequest, Department, DepartmentPermission, Role,
        UpdateDepartmentRequest, UpdatePermissionsRequest,
    },
    permissions::require_role,
};

use super::{entity, require_text, require_text_if_present};

fn require_code(code: &str) -> ApiResult<()> {
    let code = code.trim();
    if code.is_empty() || code.len() > 16 || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(api_validation_error(
            "code must be 1-16 letters, digits or underscores",
        ));
    }
    Ok(())
}

/// list_departments
///
/// [Authenticated Route] Active departments, by name.
#[utoipa::path(
    get,
    path = "/departments",
    responses((status = 200, description = "Departments", body = [Department]))
)]
pub async fn list_departments(
    _user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Department>>> {
    Ok(Json(state.repo.list_departments().await?))
}

#[utoipa::path(
    post,
    path = "/admin/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Created", body = Department),
        (status = 409, description = "Name or code taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_department(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<CreateDepartmentRequest>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    require_role(&user, &[Role::Admin])?;
    require_text("name", &payload.name)?;
    require_code(&payload.code)?;

    let department = state.repo.create_department(payload).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Create, entity::DEPARTMENT)
            .entity(department.id)
            .actor(user.id)
            .new_values(&department)
            .context(&ctx),
    )
    .await;

    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    put,
    path = "/admin/departments/{id}",
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Updated", body = Department),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_department(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDepartmentRequest>,
) -> ApiResult<Json<Department>> {
    require_role(&user, &[Role::Admin])?;
    require_text_if_present("name", payload.name.as_deref())?;
    if let Some(code) = payload.code.as_deref() {
        require_code(code)?;
    }

    let old = state
        .repo
        .get_department(id)
        .await?
        .ok_or_else(|| api_not_found("department not found"))?;
    let updated = state.repo.update_department(id, payload).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Update, entity::DEPARTMENT)
            .entity(id)
            .actor(user.id)
            .old(&old)
            .new_values(&updated)
            .context(&ctx),
    )
    .await;

    Ok(Json(updated))
}

/// delete_department
///
/// [Admin Route] Soft delete. Cached permissions of the department are dropped.
#[utoipa::path(
    delete,
    path = "/admin/departments/{id}",
    responses(
        (status = 204, description = "Deactivated"),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_department(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_role(&user, &[Role::Admin])?;
    let removed = state.repo.deactivate_department(id).await?;
    state.permissions.invalidate_department(id).await;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Delete, entity::DEPARTMENT)
            .entity(id)
            .actor(user.id)
            .old(&removed)
            .context(&ctx),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/admin/departments/{id}/permissions",
    responses(
        (status = 200, description = "Stored permission rows", body = [DepartmentPermission]),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_permissions(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<DepartmentPermission>>> {
    require_role(&user, &[Role::Admin])?;
    if state.repo.get_department(id).await?.is_none() {
        return Err(api_not_found("department not found"));
    }
    Ok(Json(state.repo.list_permissions(id).await?))
}

/// update_permissions
///
/// [Admin Route] Upserts the given module rows in one transaction. Modules not
/// listed keep their current row. The permission cache for the department is
/// invalidated before responding.
#[utoipa::path(
    put,
    path = "/admin/departments/{id}/permissions",
    request_body = UpdatePermissionsRequest,
    responses(
        (status = 200, description = "Stored permission rows", body = [DepartmentPermission]),
        (status = 400, description = "Duplicate module", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_permissions(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePermissionsRequest>,
) -> ApiResult<Json<Vec<DepartmentPermission>>> {
    require_role(&user, &[Role::Admin])?;
    let mut seen = HashSet::new();
    if let Some(dup) = payload.permissions.iter().find(|p| !seen.insert(p.module)) {
        return Err(api_validation_error(&format!(
            "module {} listed more than once",
            dup.module.as_str()
        )));
    }

    let old = state.repo.list_permissions(id).await?;
    let rows = state.repo.upsert_permissions(id, &payload.permissions).await?;
    state.permissions.invalidate_department(id).await;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::PermissionUpdate, entity::PERMISSION)
            .entity(id)
            .actor(user.id)
            .old(&old)
            .new_values(&rows)
            .context(&ctx),
    )
    .await;

    Ok(Json(rows))
}
