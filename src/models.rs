use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Enumerations (stored as TEXT) ---

/// Role
///
/// RBAC field on every user. `Admin` bypasses department permission checks entirely.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    Admin,
    Manager,
    #[default]
    User,
}

/// Module
///
/// Resource area used as the permission-check key together with the department.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Module {
    Assets,
    Documents,
    DigitalAssets,
    Users,
    Departments,
    AuditLogs,
    Dashboard,
}

impl Module {
    pub const ALL: [Module; 7] = [
        Module::Assets,
        Module::Documents,
        Module::DigitalAssets,
        Module::Users,
        Module::Departments,
        Module::AuditLogs,
        Module::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Assets => "ASSETS",
            Module::Documents => "DOCUMENTS",
            Module::DigitalAssets => "DIGITAL_ASSETS",
            Module::Users => "USERS",
            Module::Departments => "DEPARTMENTS",
            Module::AuditLogs => "AUDIT_LOGS",
            Module::Dashboard => "DASHBOARD",
        }
    }

    pub fn parse(raw: &str) -> Option<Module> {
        let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
        Module::ALL.into_iter().find(|m| m.as_str() == normalized)
    }
}

/// AssetCategory
///
/// Physical asset classification. Each category owns the three-letter code that
/// closes every barcode (`SEQ.ORDER.QUOTA.YEAR.CODE`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum AssetCategory {
    Electronics,
    Furniture,
    Vehicle,
    Machinery,
    OfficeEquipment,
    Building,
    Other,
}

impl AssetCategory {
    pub fn code(&self) -> &'static str {
        match self {
            AssetCategory::Electronics => "ELC",
            AssetCategory::Furniture => "FUR",
            AssetCategory::Vehicle => "VEH",
            AssetCategory::Machinery => "MCH",
            AssetCategory::OfficeEquipment => "OFE",
            AssetCategory::Building => "BLD",
            AssetCategory::Other => "OTH",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum AssetStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
    Retired,
    Lost,
}

/// DigitalAssetKind
///
/// Media family of a digital asset, derived from its MIME type or extension when
/// the client does not supply one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum DigitalAssetKind {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Other,
}

impl DigitalAssetKind {
    pub fn detect(mime_type: &str, file_name: &str) -> Self {
        let mime = mime_type.to_ascii_lowercase();
        if mime.starts_with("image/") {
            return DigitalAssetKind::Image;
        }
        if mime.starts_with("video/") {
            return DigitalAssetKind::Video;
        }
        if mime.starts_with("audio/") {
            return DigitalAssetKind::Audio;
        }
        match crate::compression::extension_of(file_name).as_deref() {
            Some("zip" | "rar" | "7z" | "tar" | "gz") => DigitalAssetKind::Archive,
            Some("pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "csv") => {
                DigitalAssetKind::Document
            }
            _ => DigitalAssetKind::Other,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    PasswordChange,
    PasswordReset,
    PermissionUpdate,
    BackupCreate,
    BackupDelete,
    SettingsUpdate,
}

/// Target of a presigned upload; decides the object key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum UploadKind {
    #[default]
    Document,
    DigitalAsset,
}

impl UploadKind {
    pub fn key_prefix(&self) -> &'static str {
        match self {
            UploadKind::Document => "documents",
            UploadKind::DigitalAsset => "digital-assets",
        }
    }
}

// --- Core records (mapped to tables) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// User
///
/// Public view of a `users` row. The password hash is only ever read through
/// `UserCredentials`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    #[ts(type = "string | null")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Internal row used by login and password changes.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: String,
    pub is_active: bool,
}

/// DepartmentPermission
///
/// Stored `(department, module) → {can_read, can_write, can_delete}` row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct DepartmentPermission {
    pub id: Uuid,
    pub department_id: Uuid,
    pub module: Module,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Asset {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    pub description: Option<String>,
    pub category: AssetCategory,
    pub status: AssetStatus,
    pub location: Option<String>,
    pub department_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub serial_number: Option<String>,
    #[ts(type = "string | null")]
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub order_number: i32,
    pub quota: i32,
    pub is_active: bool,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub file_name: String,
    pub file_key: String,
    pub mime_type: String,
    pub file_size: i64,
    pub compressed_size: i64,
    pub department_id: Option<Uuid>,
    pub tags: Option<String>,
    pub version: i32,
    pub is_active: bool,
    pub uploaded_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct DigitalAsset {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: DigitalAssetKind,
    pub file_name: String,
    pub file_key: String,
    pub mime_type: String,
    pub file_size: i64,
    pub compressed_size: i64,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub uploaded_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// AuditLog
///
/// Append-only trace entry. `old_values` / `new_values` hold JSON text snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct AuditLog {
    pub id: i64,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub actor_id: Option<Uuid>,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the audit table.
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub actor_id: Option<Uuid>,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct BackupSettings {
    pub enabled: bool,
    /// Daily run time, `HH:MM` (24h, UTC).
    pub schedule_time: String,
    pub retention_days: i64,
    #[ts(type = "string | null")]
    pub last_backup_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Raw `ai_settings` row. Never serialized directly; see `AiSettingsResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct AiSettings {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: i64,
    pub updated_at: DateTime<Utc>,
}

// --- Request payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateDepartmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// ModulePermission
///
/// Resolved (or requested) flags for one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ModulePermission {
    pub module: Module,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdatePermissionsRequest {
    pub permissions: Vec<ModulePermission>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateAssetRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: AssetCategory,
    #[serde(default)]
    pub status: AssetStatus,
    pub location: Option<String>,
    pub department_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub serial_number: Option<String>,
    #[ts(type = "string | null")]
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    /// Position of the item within its procurement order (defaults to 1).
    pub order_number: Option<i32>,
    /// Quantity procured in the same order (defaults to 1).
    pub quota: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAssetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AssetStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub file_name: String,
    /// Object key returned by `POST /upload/presigned`.
    pub file_key: String,
    pub mime_type: String,
    pub file_size: i64,
    pub department_id: Option<Uuid>,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateDocumentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Replacement file; when present the version is bumped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileReplacement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FileReplacement {
    pub file_name: String,
    pub file_key: String,
    pub mime_type: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateDigitalAssetRequest {
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<DigitalAssetKind>,
    pub file_name: String,
    pub file_key: String,
    pub mime_type: String,
    pub file_size: i64,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateDigitalAssetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DigitalAssetKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "q3_inventory.xlsx")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")]
    pub file_type: String,
    #[serde(default)]
    pub kind: UploadKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    pub upload_url: String,
    pub resource_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct DownloadUrlResponse {
    pub download_url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct CompressionEstimateRequest {
    pub file_name: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateBackupSettingsRequest {
    pub enabled: bool,
    pub schedule_time: String,
    pub retention_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct BackupFile {
    pub name: String,
    pub size: u64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BackupCleanupReport {
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AiSettingsResponse {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    /// Masked key (`****abcd`), or null when none is stored.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: i64,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// UpdateAiSettingsRequest
///
/// `api_key` omitted keeps the stored key; an empty string clears it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateAiSettingsRequest {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AiConnectionTestResult {
    pub ok: bool,
    pub status: u16,
    pub latency_ms: u64,
}

// --- Dashboard & profile output ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct StatusCount {
    pub status: AssetStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardStats {
    pub total_assets: i64,
    pub assets_by_status: Vec<StatusCount>,
    pub total_documents: i64,
    pub total_digital_assets: i64,
    pub total_users: i64,
    pub total_departments: i64,
    /// Sum of original file sizes across documents and digital assets.
    pub stored_bytes: i64,
    /// Bytes saved according to the compression estimates.
    pub saved_bytes: i64,
    pub recent_activity: Vec<AuditLog>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub user: User,
    pub department: Option<Department>,
    pub permissions: Vec<ModulePermission>,
}

/// Page
///
/// Paginated list envelope.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// --- Query filters ---

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_LIMIT;

/// Page number (1-based) and size, clamped to `1..=MAX_PAGE_LIMIT`. The page
/// is capped so `offset` cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn wrap<T>(&self, items: Vec<T>, total: i64) -> Page<T> {
        Page {
            items,
            total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AssetFilter {
    /// Matches name, barcode or serial number.
    pub search: Option<String>,
    pub category: Option<AssetCategory>,
    pub status: Option<AssetStatus>,
    pub department_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DocumentFilter {
    /// Matches title, description or tags.
    pub search: Option<String>,
    pub category: Option<String>,
    pub department_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DigitalAssetFilter {
    pub search: Option<String>,
    pub kind: Option<DigitalAssetKind>,
    pub department_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UserFilter {
    /// Matches email or name.
    pub search: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AuditLogFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_bounds() {
        let p = Pagination::new(Some(0), Some(10_000));
        assert_eq!(p, Pagination { page: 1, limit: MAX_PAGE_LIMIT });
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(Some(3), Some(25));
        assert_eq!(p.offset(), 50);

        let p = Pagination::new(None, Some(-5));
        assert_eq!(p.limit, 1);

        let p = Pagination::new(Some(i64::MAX), Some(MAX_PAGE_LIMIT));
        assert_eq!(p.page, MAX_PAGE);
        assert!(p.offset() > 0);
    }

    #[test]
    fn module_parse_accepts_kebab_and_lowercase() {
        assert_eq!(Module::parse("digital-assets"), Some(Module::DigitalAssets));
        assert_eq!(Module::parse("users"), Some(Module::Users));
        assert_eq!(Module::parse("reports"), None);
    }

    #[test]
    fn digital_asset_kind_prefers_mime_type() {
        assert_eq!(DigitalAssetKind::detect("image/png", "x.bin"), DigitalAssetKind::Image);
        assert_eq!(
            DigitalAssetKind::detect("application/octet-stream", "bundle.ZIP"),
            DigitalAssetKind::Archive
        );
        assert_eq!(
            DigitalAssetKind::detect("application/pdf", "manual.pdf"),
            DigitalAssetKind::Document
        );
        assert_eq!(DigitalAssetKind::detect("", "noext"), DigitalAssetKind::Other);
    }

    #[test]
    fn role_serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let parsed: Module = serde_json::from_str("\"DIGITAL_ASSETS\"").unwrap();
        assert_eq!(parsed, Module::DigitalAssets);
    }
}
