use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    models::{DashboardStats, Module},
    permissions::Action,
};

/// Number of audit entries included in `recent_activity`.
pub const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// get_dashboard_stats
///
/// [Authenticated Route] Aggregate counters for the landing page.
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    responses((status = 200, description = "Dashboard counters", body = DashboardStats))
)]
pub async fn get_dashboard_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<DashboardStats>> {
    state.permissions.require(&user, Module::Dashboard, Action::Read).await?;
    Ok(Json(state.repo.dashboard_stats(RECENT_ACTIVITY_LIMIT).await?))
}
