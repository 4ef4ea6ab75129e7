use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    audit::{self, AuditContext, AuditEvent},
    auth::AuthUser,
    backup::{MAX_RETENTION_DAYS, scheduler::parse_schedule_time},
    error::{ApiResult, api_validation_error},
    models::{AuditAction, BackupFile, BackupSettings, Role, UpdateBackupSettingsRequest},
    permissions::require_role,
};

use super::entity;

/// list_backups
///
/// [Admin Route] Backup files in `BACKUP_DIR`, newest first.
#[utoipa::path(
    get,
    path = "/admin/backups",
    responses((status = 200, description = "Backups", body = [BackupFile]))
)]
pub async fn list_backups(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<BackupFile>>> {
    require_role(&user, &[Role::Admin])?;
    Ok(Json(state.backups.list_backups().await?))
}

/// create_backup
///
/// [Admin Route] Immediate snapshot, independent of the schedule.
#[utoipa::path(
    post,
    path = "/admin/backups",
    responses(
        (status = 201, description = "Backup written", body = BackupFile),
        (status = 409, description = "A backup with this timestamp exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_backup(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
) -> ApiResult<(StatusCode, Json<BackupFile>)> {
    require_role(&user, &[Role::Admin])?;
    let backup = state.backups.create_backup().await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::BackupCreate, entity::BACKUP)
            .entity(&backup.name)
            .actor(user.id)
            .new_values(&backup)
            .context(&ctx),
    )
    .await;

    Ok((StatusCode::CREATED, Json(backup)))
}

#[utoipa::path(
    delete,
    path = "/admin/backups/{name}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Not a backup file name", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_backup(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    require_role(&user, &[Role::Admin])?;
    state.backups.delete_backup(&name).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::BackupDelete, entity::BACKUP)
            .entity(&name)
            .actor(user.id)
            .context(&ctx),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/admin/backups/settings",
    responses((status = 200, description = "Backup schedule", body = BackupSettings))
)]
pub async fn get_backup_settings(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<BackupSettings>> {
    require_role(&user, &[Role::Admin])?;
    Ok(Json(state.repo.get_backup_settings().await?))
}

/// update_backup_settings
///
/// [Admin Route] `schedule_time` must be `HH:MM`; `retention_days` at least 1.
#[utoipa::path(
    put,
    path = "/admin/backups/settings",
    request_body = UpdateBackupSettingsRequest,
    responses(
        (status = 200, description = "Updated", body = BackupSettings),
        (status = 400, description = "Invalid schedule", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_backup_settings(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<UpdateBackupSettingsRequest>,
) -> ApiResult<Json<BackupSettings>> {
    require_role(&user, &[Role::Admin])?;
    if parse_schedule_time(&payload.schedule_time).is_none() {
        return Err(api_validation_error("schedule_time must be HH:MM (24h)"));
    }
    if !(1..=MAX_RETENTION_DAYS).contains(&payload.retention_days) {
        return Err(api_validation_error(&format!(
            "retention_days must be between 1 and {MAX_RETENTION_DAYS}"
        )));
    }

    let old = state.repo.get_backup_settings().await?;
    let updated = state
        .repo
        .update_backup_settings(UpdateBackupSettingsRequest {
            schedule_time: payload.schedule_time.trim().to_string(),
            ..payload
        })
        .await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::SettingsUpdate, entity::BACKUP_SETTINGS)
            .actor(user.id)
            .old(&old)
            .new_values(&updated)
            .context(&ctx),
    )
    .await;

    Ok(Json(updated))
}
