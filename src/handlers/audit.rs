use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    models::{AuditLog, AuditLogFilter, Module, Page, Role},
    permissions::Action,
};

/// list_audit_logs
///
/// [Authenticated Route] Newest first. Managers may always read the trail; other
/// roles need `AUDIT_LOGS` read permission.
#[utoipa::path(
    get,
    path = "/audit-logs",
    params(AuditLogFilter),
    responses(
        (status = 200, description = "Paginated audit entries", body = Page<AuditLog>),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_audit_logs(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AuditLogFilter>,
) -> ApiResult<Json<Page<AuditLog>>> {
    if user.role != Role::Manager {
        state.permissions.require(&user, Module::AuditLogs, Action::Read).await?;
    }
    Ok(Json(state.repo.list_audit_logs(filter).await?))
}
