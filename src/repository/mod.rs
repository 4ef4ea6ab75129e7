use crate::models::{
    AiSettings, Asset, AssetFilter, AuditLog, AuditLogFilter, BackupSettings, CreateAssetRequest,
    CreateDepartmentRequest, CreateDigitalAssetRequest, CreateDocumentRequest, DashboardStats,
    Department, DepartmentPermission, DigitalAsset, DigitalAssetFilter, DigitalAssetKind,
    Document, DocumentFilter, Module, ModulePermission, NewAuditLog, Page,
    UpdateAiSettingsRequest, UpdateAssetRequest, UpdateBackupSettingsRequest,
    UpdateDepartmentRequest, UpdateDigitalAssetRequest, UpdateDocumentRequest, UpdateUserRequest,
    User, UserCredentials, UserFilter, Role,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{path::Path, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

pub mod sqlite;

pub use sqlite::SqliteRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Insert payload for a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers, the auth extractor,
/// the permission service, the backup scheduler and the CLI all go through it.
///
/// Detail lookups return `Ok(None)` for missing or soft-deleted rows; mutations on
/// such rows return `StoreError::NotFound`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn get_credentials(&self, id: Uuid) -> StoreResult<Option<UserCredentials>>;
    async fn get_credentials_by_email(&self, email: &str)
    -> StoreResult<Option<UserCredentials>>;
    async fn list_users(&self, filter: UserFilter) -> StoreResult<Page<User>>;
    // Conflict when the email is already registered.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> StoreResult<User>;
    async fn deactivate_user(&self, id: Uuid) -> StoreResult<User>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    // --- Departments & permissions ---
    async fn list_departments(&self) -> StoreResult<Vec<Department>>;
    async fn get_department(&self, id: Uuid) -> StoreResult<Option<Department>>;
    async fn create_department(&self, req: CreateDepartmentRequest) -> StoreResult<Department>;
    async fn update_department(
        &self,
        id: Uuid,
        req: UpdateDepartmentRequest,
    ) -> StoreResult<Department>;
    async fn deactivate_department(&self, id: Uuid) -> StoreResult<Department>;
    async fn get_permission(
        &self,
        department_id: Uuid,
        module: Module,
    ) -> StoreResult<Option<DepartmentPermission>>;
    async fn list_permissions(&self, department_id: Uuid)
    -> StoreResult<Vec<DepartmentPermission>>;
    // Insert-or-update every entry in a single transaction.
    async fn upsert_permissions(
        &self,
        department_id: Uuid,
        entries: &[ModulePermission],
    ) -> StoreResult<Vec<DepartmentPermission>>;

    // --- Physical assets ---
    async fn list_assets(&self, filter: AssetFilter) -> StoreResult<Page<Asset>>;
    async fn get_asset(&self, id: Uuid) -> StoreResult<Option<Asset>>;
    async fn get_asset_by_barcode(&self, barcode: &str) -> StoreResult<Option<Asset>>;
    // Every stored barcode (active or not) ending with `suffix`.
    async fn barcodes_with_suffix(&self, suffix: &str) -> StoreResult<Vec<String>>;
    async fn barcode_exists(&self, barcode: &str) -> StoreResult<bool>;
    // Conflict when the barcode is already taken.
    async fn create_asset(
        &self,
        req: CreateAssetRequest,
        barcode: String,
        created_by: Uuid,
    ) -> StoreResult<Asset>;
    async fn update_asset(&self, id: Uuid, req: UpdateAssetRequest) -> StoreResult<Asset>;
    async fn deactivate_asset(&self, id: Uuid) -> StoreResult<Asset>;

    // --- Documents ---
    async fn list_documents(&self, filter: DocumentFilter) -> StoreResult<Page<Document>>;
    async fn get_document(&self, id: Uuid) -> StoreResult<Option<Document>>;
    async fn create_document(
        &self,
        req: CreateDocumentRequest,
        compressed_size: i64,
        uploaded_by: Uuid,
    ) -> StoreResult<Document>;
    // `compressed_size` is `Some` only when the request replaces the file.
    async fn update_document(
        &self,
        id: Uuid,
        req: UpdateDocumentRequest,
        compressed_size: Option<i64>,
    ) -> StoreResult<Document>;
    async fn deactivate_document(&self, id: Uuid) -> StoreResult<Document>;

    // --- Digital assets ---
    async fn list_digital_assets(
        &self,
        filter: DigitalAssetFilter,
    ) -> StoreResult<Page<DigitalAsset>>;
    async fn get_digital_asset(&self, id: Uuid) -> StoreResult<Option<DigitalAsset>>;
    async fn create_digital_asset(
        &self,
        req: CreateDigitalAssetRequest,
        kind: DigitalAssetKind,
        compressed_size: i64,
        uploaded_by: Uuid,
    ) -> StoreResult<DigitalAsset>;
    async fn update_digital_asset(
        &self,
        id: Uuid,
        req: UpdateDigitalAssetRequest,
    ) -> StoreResult<DigitalAsset>;
    async fn deactivate_digital_asset(&self, id: Uuid) -> StoreResult<DigitalAsset>;

    // --- Audit ---
    async fn insert_audit_log(&self, entry: NewAuditLog) -> StoreResult<i64>;
    async fn list_audit_logs(&self, filter: AuditLogFilter) -> StoreResult<Page<AuditLog>>;

    // --- Dashboard ---
    async fn dashboard_stats(&self, recent_limit: i64) -> StoreResult<DashboardStats>;

    // --- Settings ---
    async fn get_backup_settings(&self) -> StoreResult<BackupSettings>;
    async fn update_backup_settings(
        &self,
        req: UpdateBackupSettingsRequest,
    ) -> StoreResult<BackupSettings>;
    async fn mark_backup_completed(&self, at: DateTime<Utc>) -> StoreResult<()>;
    async fn get_ai_settings(&self) -> StoreResult<AiSettings>;
    async fn update_ai_settings(&self, req: UpdateAiSettingsRequest) -> StoreResult<AiSettings>;

    // --- Maintenance ---
    // Writes a consistent copy of the whole database to `dest` (which must not exist).
    async fn snapshot_to(&self, dest: &Path) -> StoreResult<()>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
