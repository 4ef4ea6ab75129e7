use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core services.
pub mod audit;
pub mod auth;
pub mod backup;
pub mod barcode;
pub mod cache;
pub mod compression;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod storage;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use backup::BackupService;
pub use config::AppConfig;
pub use permissions::PermissionService;
pub use repository::{RepositoryState, SqliteRepository};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::get_me, handlers::auth::change_password,
        handlers::assets::list_assets, handlers::assets::get_asset,
        handlers::assets::get_asset_by_barcode, handlers::assets::create_asset,
        handlers::assets::update_asset, handlers::assets::delete_asset,
        handlers::documents::list_documents, handlers::documents::get_document,
        handlers::documents::create_document, handlers::documents::update_document,
        handlers::documents::delete_document, handlers::documents::download_document,
        handlers::digital_assets::list_digital_assets, handlers::digital_assets::get_digital_asset,
        handlers::digital_assets::create_digital_asset, handlers::digital_assets::update_digital_asset,
        handlers::digital_assets::delete_digital_asset, handlers::digital_assets::download_digital_asset,
        handlers::uploads::get_presigned_url, handlers::uploads::estimate_compression,
        handlers::users::list_users, handlers::users::get_user, handlers::users::create_user,
        handlers::users::update_user, handlers::users::delete_user, handlers::users::reset_password,
        handlers::departments::list_departments, handlers::departments::create_department,
        handlers::departments::update_department, handlers::departments::delete_department,
        handlers::departments::get_permissions, handlers::departments::update_permissions,
        handlers::audit::list_audit_logs, handlers::dashboard::get_dashboard_stats,
        handlers::backup::list_backups, handlers::backup::create_backup,
        handlers::backup::delete_backup, handlers::backup::get_backup_settings,
        handlers::backup::update_backup_settings,
        handlers::ai_settings::get_ai_settings, handlers::ai_settings::update_ai_settings,
        handlers::ai_settings::test_ai_connection
    ),
    components(
        schemas(
            error::ErrorResponse, models::Role, models::Module, models::AssetCategory,
            models::AssetStatus, models::DigitalAssetKind, models::AuditAction, models::UploadKind,
            models::User, models::Department, models::DepartmentPermission, models::Asset,
            models::Document, models::DigitalAsset, models::AuditLog, models::BackupSettings,
            models::LoginRequest, models::LoginResponse, models::ChangePasswordRequest,
            models::ResetPasswordRequest, models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateDepartmentRequest, models::UpdateDepartmentRequest,
            models::ModulePermission, models::UpdatePermissionsRequest,
            models::CreateAssetRequest, models::UpdateAssetRequest,
            models::CreateDocumentRequest, models::UpdateDocumentRequest, models::FileReplacement,
            models::CreateDigitalAssetRequest, models::UpdateDigitalAssetRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse, models::DownloadUrlResponse,
            models::CompressionEstimateRequest, compression::CompressionEstimate,
            models::UpdateBackupSettingsRequest, models::BackupFile, models::AiSettingsResponse,
            models::UpdateAiSettingsRequest, models::AiConnectionTestResult, models::StatusCount,
            models::DashboardStats, models::UserProfile,
        )
    ),
    tags(
        (name = "asset-manager", description = "Enterprise Asset & Document Management API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Single shared container for every service the handlers need. Cloning is cheap:
/// every member is an `Arc` or wraps one.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
    /// Department permission resolution with its TTL cache.
    pub permissions: PermissionService,
    pub backups: BackupService,
}

impl AppState {
    /// Wires the derived services from the repository and configuration.
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let permissions = PermissionService::new(
            repo.clone(),
            config.permission_cache_capacity,
            Duration::from_secs(config.permission_cache_ttl_secs),
        );
        let backups = BackupService::new(repo.clone(), config.backup_dir.clone());
        Self {
            repo,
            storage,
            config,
            permissions,
            backups,
        }
    }

    /// State over a fresh in-memory database and the mock storage service.
    pub async fn in_memory(config: AppConfig) -> repository::StoreResult<Self> {
        let repo = Arc::new(SqliteRepository::in_memory().await?) as RepositoryState;
        let storage = Arc::new(MockStorageService::new()) as StorageState;
        Ok(Self::new(repo, storage, config))
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` can be extracted, then stores
/// it in the request extensions for the handler's own `AuthUser` extractor.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the routers, the authentication layer, request-id propagation,
/// tracing and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Role is checked inside the admin handlers.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, tagged with the generated `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
