use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `auth_middleware` layer, so handlers always
/// receive a resolved `AuthUser`. Module-level read/write/delete checks happen in
/// the handlers against the caller's department permissions.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Profile ---
        .route("/me", get(handlers::auth::get_me))
        .route("/me/password", put(handlers::auth::change_password))
        // --- Physical assets (ASSETS) ---
        .route(
            "/assets",
            get(handlers::assets::list_assets).post(handlers::assets::create_asset),
        )
        // Scanner lookup.
        .route(
            "/assets/barcode/{barcode}",
            get(handlers::assets::get_asset_by_barcode),
        )
        .route(
            "/assets/{id}",
            get(handlers::assets::get_asset)
                .put(handlers::assets::update_asset)
                .delete(handlers::assets::delete_asset),
        )
        // --- Documents (DOCUMENTS) ---
        .route(
            "/documents",
            get(handlers::documents::list_documents).post(handlers::documents::create_document),
        )
        .route(
            "/documents/{id}",
            get(handlers::documents::get_document)
                .put(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        )
        .route(
            "/documents/{id}/download",
            get(handlers::documents::download_document),
        )
        // --- Digital assets (DIGITAL_ASSETS) ---
        .route(
            "/digital-assets",
            get(handlers::digital_assets::list_digital_assets)
                .post(handlers::digital_assets::create_digital_asset),
        )
        .route(
            "/digital-assets/{id}",
            get(handlers::digital_assets::get_digital_asset)
                .put(handlers::digital_assets::update_digital_asset)
                .delete(handlers::digital_assets::delete_digital_asset),
        )
        .route(
            "/digital-assets/{id}/download",
            get(handlers::digital_assets::download_digital_asset),
        )
        // --- Uploads ---
        // Presigned PUT URL; the returned key is then passed to POST /documents
        // or POST /digital-assets.
        .route("/upload/presigned", post(handlers::uploads::get_presigned_url))
        .route(
            "/compression/estimate",
            post(handlers::uploads::estimate_compression),
        )
        // --- Users (USERS) ---
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // --- Read-only views ---
        .route("/departments", get(handlers::departments::list_departments))
        .route("/audit-logs", get(handlers::audit::list_audit_logs))
        .route("/dashboard/stats", get(handlers::dashboard::get_dashboard_stats))
}
