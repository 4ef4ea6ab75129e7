use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Nested under `/admin`. Each handler extracts `AuthUser` itself and rejects any
/// role other than ADMIN with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Users ---
        .route(
            "/users/{id}/reset-password",
            post(handlers::users::reset_password),
        )
        // --- Departments & permissions ---
        .route(
            "/departments",
            post(handlers::departments::create_department),
        )
        .route(
            "/departments/{id}",
            put(handlers::departments::update_department)
                .delete(handlers::departments::delete_department),
        )
        .route(
            "/departments/{id}/permissions",
            get(handlers::departments::get_permissions)
                .put(handlers::departments::update_permissions),
        )
        // --- Backups ---
        .route(
            "/backups",
            get(handlers::backup::list_backups).post(handlers::backup::create_backup),
        )
        // Static `settings` wins over the `{name}` capture.
        .route(
            "/backups/settings",
            get(handlers::backup::get_backup_settings)
                .put(handlers::backup::update_backup_settings),
        )
        .route("/backups/{name}", delete(handlers::backup::delete_backup))
        // --- AI integration ---
        .route(
            "/ai-settings",
            get(handlers::ai_settings::get_ai_settings)
                .put(handlers::ai_settings::update_ai_settings),
        )
        .route(
            "/ai-settings/test",
            post(handlers::ai_settings::test_ai_connection),
        )
}
