//! SQLite implementation of the `Repository` trait.
//!
//! All queries are runtime-checked (`sqlx::query_as::<_, T>`) so the crate builds
//! without a live database. Dynamic list filters go through `QueryBuilder`, and
//! every user-provided value is bound, never interpolated.
use super::{NewUser, Repository, StoreError, StoreResult};
use crate::models::{
    AiSettings, Asset, AssetFilter, AuditLog, AuditLogFilter, BackupSettings, CreateAssetRequest,
    CreateDepartmentRequest, CreateDigitalAssetRequest, CreateDocumentRequest, DashboardStats,
    Department, DepartmentPermission, DigitalAsset, DigitalAssetFilter, DigitalAssetKind,
    Document, DocumentFilter, Module, ModulePermission, NewAuditLog, Page, Pagination,
    StatusCount, UpdateAiSettingsRequest, UpdateAssetRequest, UpdateBackupSettingsRequest,
    UpdateDepartmentRequest, UpdateDigitalAssetRequest, UpdateDocumentRequest, UpdateUserRequest,
    User, UserCredentials, UserFilter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, QueryBuilder, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, name, role, department_id, is_active, last_login_at, created_at, updated_at";
const DEPARTMENT_COLUMNS: &str = "id, name, code, description, is_active, created_at, updated_at";
const PERMISSION_COLUMNS: &str =
    "id, department_id, module, can_read, can_write, can_delete, updated_at";
const ASSET_COLUMNS: &str = "id, barcode, name, description, category, status, location, \
     department_id, assigned_to, serial_number, purchase_date, purchase_price, order_number, \
     quota, is_active, created_by, created_at, updated_at";
const DOCUMENT_COLUMNS: &str = "id, title, description, category, file_name, file_key, \
     mime_type, file_size, compressed_size, department_id, tags, version, is_active, \
     uploaded_by, created_at, updated_at";
const DIGITAL_ASSET_COLUMNS: &str = "id, name, description, kind, file_name, file_key, \
     mime_type, file_size, compressed_size, department_id, is_active, uploaded_by, created_at, \
     updated_at";
const AUDIT_COLUMNS: &str = "id, action, entity_type, entity_id, actor_id, old_values, \
     new_values, ip_address, user_agent, created_at";
const BACKUP_SETTINGS_COLUMNS: &str =
    "enabled, schedule_time, retention_days, last_backup_at, updated_at";
const AI_SETTINGS_COLUMNS: &str =
    "enabled, provider, model, api_key, base_url, temperature, max_tokens, updated_at";

/// SqliteRepository
///
/// The concrete `Repository`, backed by a single SQLite database file (or an
/// in-memory database for tests).
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database at `url` and applies migrations.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Unexpected(e.into()))?;
            }
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    /// Fresh, migrated in-memory database.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is pinned
    /// to one connection that is never recycled.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unexpected(e.into()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the same filter closure against a `COUNT(*)` and a paged `SELECT`.
    async fn fetch_page<T, F>(
        &self,
        columns: &str,
        table: &str,
        push_filters: F,
        order_by: &str,
        page: Pagination,
    ) -> StoreResult<Page<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
        F: Fn(&mut QueryBuilder<'_, Sqlite>),
    {
        let mut count: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {table} WHERE 1 = 1"));
        push_filters(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {columns} FROM {table} WHERE 1 = 1"));
        push_filters(&mut select);
        select.push(format!(" ORDER BY {order_by} LIMIT "));
        select.push_bind(page.limit);
        select.push(" OFFSET ");
        select.push_bind(page.offset());
        let items = select.build_query_as::<T>().fetch_all(&self.pool).await?;

        Ok(page.wrap(items, total))
    }
}

/// Maps constraint violations on writes to domain errors.
fn map_write_err(err: sqlx::Error, conflict: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(conflict.to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound("referenced record".to_string());
        }
    }
    StoreError::Database(err)
}

fn like(term: &str) -> String {
    format!("%{}%", term.trim())
}

#[async_trait]
impl Repository for SqliteRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_credentials(&self, id: Uuid) -> StoreResult<Option<UserCredentials>> {
        Ok(sqlx::query_as::<_, UserCredentials>(
            "SELECT id, password_hash, is_active FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_credentials_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<UserCredentials>> {
        Ok(sqlx::query_as::<_, UserCredentials>(
            "SELECT id, password_hash, is_active FROM users WHERE email = ? COLLATE NOCASE",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_users(&self, filter: UserFilter) -> StoreResult<Page<User>> {
        let page = Pagination::new(filter.page, filter.limit);
        self.fetch_page(
            USER_COLUMNS,
            "users",
            |b| {
                if !filter.include_inactive {
                    b.push(" AND is_active = 1");
                }
                if let Some(search) = &filter.search {
                    b.push(" AND (email LIKE ");
                    b.push_bind(like(search));
                    b.push(" OR name LIKE ");
                    b.push_bind(like(search));
                    b.push(")");
                }
                if let Some(role) = filter.role {
                    b.push(" AND role = ");
                    b.push_bind(role);
                }
                if let Some(department_id) = filter.department_id {
                    b.push(" AND department_id = ");
                    b.push_bind(department_id);
                }
            },
            "name ASC",
            page,
        )
        .await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO users (id, email, name, password_hash, role, department_id, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email.trim().to_lowercase())
            .bind(user.name.trim())
            .bind(user.password_hash)
            .bind(user.role)
            .bind(user.department_id)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "email already in use"))
    }

    async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET name = COALESCE(?, name), role = COALESCE(?, role), \
             department_id = COALESCE(?, department_id), is_active = COALESCE(?, is_active), \
             updated_at = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(req.name)
            .bind(req.role)
            .bind(req.department_id)
            .bind(req.is_active)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "user update conflicts with existing data"))?
            .ok_or_else(|| StoreError::NotFound("user".into()))
    }

    async fn deactivate_user(&self, id: Uuid) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1 \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("user".into()))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- DEPARTMENTS & PERMISSIONS ---

    async fn list_departments(&self) -> StoreResult<Vec<Department>> {
        let sql =
            format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE is_active = 1 ORDER BY name");
        Ok(sqlx::query_as::<_, Department>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_department(&self, id: Uuid) -> StoreResult<Option<Department>> {
        let sql = format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = ? AND is_active = 1"
        );
        Ok(sqlx::query_as::<_, Department>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_department(&self, req: CreateDepartmentRequest) -> StoreResult<Department> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO departments (id, name, code, description, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 1, ?, ?) RETURNING {DEPARTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name.trim())
            .bind(req.code.trim().to_uppercase())
            .bind(req.description)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "department name or code already exists"))
    }

    async fn update_department(
        &self,
        id: Uuid,
        req: UpdateDepartmentRequest,
    ) -> StoreResult<Department> {
        let sql = format!(
            "UPDATE departments SET name = COALESCE(?, name), code = COALESCE(?, code), \
             description = COALESCE(?, description), updated_at = ? \
             WHERE id = ? AND is_active = 1 RETURNING {DEPARTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&sql)
            .bind(req.name.map(|n| n.trim().to_string()))
            .bind(req.code.map(|c| c.trim().to_uppercase()))
            .bind(req.description)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "department name or code already exists"))?
            .ok_or_else(|| StoreError::NotFound("department".into()))
    }

    async fn deactivate_department(&self, id: Uuid) -> StoreResult<Department> {
        let sql = format!(
            "UPDATE departments SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1 \
             RETURNING {DEPARTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&sql)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("department".into()))
    }

    async fn get_permission(
        &self,
        department_id: Uuid,
        module: Module,
    ) -> StoreResult<Option<DepartmentPermission>> {
        let sql = format!(
            "SELECT {PERMISSION_COLUMNS} FROM department_permissions \
             WHERE department_id = ? AND module = ?"
        );
        Ok(sqlx::query_as::<_, DepartmentPermission>(&sql)
            .bind(department_id)
            .bind(module)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_permissions(
        &self,
        department_id: Uuid,
    ) -> StoreResult<Vec<DepartmentPermission>> {
        let sql = format!(
            "SELECT {PERMISSION_COLUMNS} FROM department_permissions \
             WHERE department_id = ? ORDER BY module"
        );
        Ok(sqlx::query_as::<_, DepartmentPermission>(&sql)
            .bind(department_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn upsert_permissions(
        &self,
        department_id: Uuid,
        entries: &[ModulePermission],
    ) -> StoreResult<Vec<DepartmentPermission>> {
        if self.get_department(department_id).await?.is_none() {
            return Err(StoreError::NotFound("department".into()));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT INTO department_permissions \
                 (id, department_id, module, can_read, can_write, can_delete, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT (department_id, module) DO UPDATE SET \
                 can_read = excluded.can_read, can_write = excluded.can_write, \
                 can_delete = excluded.can_delete, updated_at = excluded.updated_at",
            )
            .bind(Uuid::new_v4())
            .bind(department_id)
            .bind(entry.module)
            .bind(entry.can_read)
            .bind(entry.can_write)
            .bind(entry.can_delete)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            "SELECT {PERMISSION_COLUMNS} FROM department_permissions \
             WHERE department_id = ? ORDER BY module"
        );
        let rows = sqlx::query_as::<_, DepartmentPermission>(&sql)
            .bind(department_id)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(rows)
    }

    // --- PHYSICAL ASSETS ---

    async fn list_assets(&self, filter: AssetFilter) -> StoreResult<Page<Asset>> {
        let page = Pagination::new(filter.page, filter.limit);
        self.fetch_page(
            ASSET_COLUMNS,
            "assets",
            |b| {
                b.push(" AND is_active = 1");
                if let Some(search) = &filter.search {
                    b.push(" AND (name LIKE ");
                    b.push_bind(like(search));
                    b.push(" OR barcode LIKE ");
                    b.push_bind(like(search));
                    b.push(" OR serial_number LIKE ");
                    b.push_bind(like(search));
                    b.push(")");
                }
                if let Some(category) = filter.category {
                    b.push(" AND category = ");
                    b.push_bind(category);
                }
                if let Some(status) = filter.status {
                    b.push(" AND status = ");
                    b.push_bind(status);
                }
                if let Some(department_id) = filter.department_id {
                    b.push(" AND department_id = ");
                    b.push_bind(department_id);
                }
            },
            "created_at DESC",
            page,
        )
        .await
    }

    async fn get_asset(&self, id: Uuid) -> StoreResult<Option<Asset>> {
        let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ? AND is_active = 1");
        Ok(sqlx::query_as::<_, Asset>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_asset_by_barcode(&self, barcode: &str) -> StoreResult<Option<Asset>> {
        let sql =
            format!("SELECT {ASSET_COLUMNS} FROM assets WHERE barcode = ? AND is_active = 1");
        Ok(sqlx::query_as::<_, Asset>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn barcodes_with_suffix(&self, suffix: &str) -> StoreResult<Vec<String>> {
        Ok(
            sqlx::query_scalar::<_, String>("SELECT barcode FROM assets WHERE barcode LIKE ?")
                .bind(format!("%{suffix}"))
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn barcode_exists(&self, barcode: &str) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE barcode = ?")
            .bind(barcode)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn create_asset(
        &self,
        req: CreateAssetRequest,
        barcode: String,
        created_by: Uuid,
    ) -> StoreResult<Asset> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO assets (id, barcode, name, description, category, status, location, \
             department_id, assigned_to, serial_number, purchase_date, purchase_price, \
             order_number, quota, is_active, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?) \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&sql)
            .bind(Uuid::new_v4())
            .bind(barcode)
            .bind(req.name.trim())
            .bind(req.description)
            .bind(req.category)
            .bind(req.status)
            .bind(req.location)
            .bind(req.department_id)
            .bind(req.assigned_to)
            .bind(req.serial_number)
            .bind(req.purchase_date)
            .bind(req.purchase_price)
            .bind(req.order_number.unwrap_or(1))
            .bind(req.quota.unwrap_or(1))
            .bind(created_by)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "barcode already exists"))
    }

    async fn update_asset(&self, id: Uuid, req: UpdateAssetRequest) -> StoreResult<Asset> {
        let sql = format!(
            "UPDATE assets SET name = COALESCE(?, name), description = COALESCE(?, description), \
             status = COALESCE(?, status), location = COALESCE(?, location), \
             department_id = COALESCE(?, department_id), assigned_to = COALESCE(?, assigned_to), \
             serial_number = COALESCE(?, serial_number), purchase_date = COALESCE(?, purchase_date), \
             purchase_price = COALESCE(?, purchase_price), updated_at = ? \
             WHERE id = ? AND is_active = 1 RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&sql)
            .bind(req.name)
            .bind(req.description)
            .bind(req.status)
            .bind(req.location)
            .bind(req.department_id)
            .bind(req.assigned_to)
            .bind(req.serial_number)
            .bind(req.purchase_date)
            .bind(req.purchase_price)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "asset update conflicts with existing data"))?
            .ok_or_else(|| StoreError::NotFound("asset".into()))
    }

    async fn deactivate_asset(&self, id: Uuid) -> StoreResult<Asset> {
        let sql = format!(
            "UPDATE assets SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1 \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&sql)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("asset".into()))
    }

    // --- DOCUMENTS ---

    async fn list_documents(&self, filter: DocumentFilter) -> StoreResult<Page<Document>> {
        let page = Pagination::new(filter.page, filter.limit);
        self.fetch_page(
            DOCUMENT_COLUMNS,
            "documents",
            |b| {
                b.push(" AND is_active = 1");
                if let Some(search) = &filter.search {
                    b.push(" AND (title LIKE ");
                    b.push_bind(like(search));
                    b.push(" OR description LIKE ");
                    b.push_bind(like(search));
                    b.push(" OR tags LIKE ");
                    b.push_bind(like(search));
                    b.push(")");
                }
                if let Some(category) = &filter.category {
                    b.push(" AND category = ");
                    b.push_bind(category.clone());
                }
                if let Some(department_id) = filter.department_id {
                    b.push(" AND department_id = ");
                    b.push_bind(department_id);
                }
            },
            "created_at DESC",
            page,
        )
        .await
    }

    async fn get_document(&self, id: Uuid) -> StoreResult<Option<Document>> {
        let sql =
            format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ? AND is_active = 1");
        Ok(sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_document(
        &self,
        req: CreateDocumentRequest,
        compressed_size: i64,
        uploaded_by: Uuid,
    ) -> StoreResult<Document> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO documents (id, title, description, category, file_name, file_key, \
             mime_type, file_size, compressed_size, department_id, tags, version, is_active, \
             uploaded_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, 1, ?, ?, ?) RETURNING {DOCUMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.title.trim())
            .bind(req.description)
            .bind(req.category.trim())
            .bind(req.file_name)
            .bind(req.file_key)
            .bind(req.mime_type)
            .bind(req.file_size)
            .bind(compressed_size)
            .bind(req.department_id)
            .bind(req.tags)
            .bind(uploaded_by)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "document already exists"))
    }

    async fn update_document(
        &self,
        id: Uuid,
        req: UpdateDocumentRequest,
        compressed_size: Option<i64>,
    ) -> StoreResult<Document> {
        let (file_name, file_key, mime_type, file_size) = match req.file {
            Some(f) => (Some(f.file_name), Some(f.file_key), Some(f.mime_type), Some(f.file_size)),
            None => (None, None, None, None),
        };
        let sql = format!(
            "UPDATE documents SET title = COALESCE(?, title), \
             description = COALESCE(?, description), category = COALESCE(?, category), \
             department_id = COALESCE(?, department_id), tags = COALESCE(?, tags), \
             file_name = COALESCE(?, file_name), file_key = COALESCE(?, file_key), \
             mime_type = COALESCE(?, mime_type), file_size = COALESCE(?, file_size), \
             compressed_size = COALESCE(?, compressed_size), \
             version = version + (CASE WHEN ? IS NOT NULL AND ? <> file_key THEN 1 ELSE 0 END), \
             updated_at = ? WHERE id = ? AND is_active = 1 RETURNING {DOCUMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&sql)
            .bind(req.title)
            .bind(req.description)
            .bind(req.category)
            .bind(req.department_id)
            .bind(req.tags)
            .bind(file_name)
            .bind(file_key.clone())
            .bind(mime_type)
            .bind(file_size)
            .bind(compressed_size)
            .bind(file_key.clone())
            .bind(file_key)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "document update conflicts with existing data"))?
            .ok_or_else(|| StoreError::NotFound("document".into()))
    }

    async fn deactivate_document(&self, id: Uuid) -> StoreResult<Document> {
        let sql = format!(
            "UPDATE documents SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1 \
             RETURNING {DOCUMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&sql)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("document".into()))
    }

    // --- DIGITAL ASSETS ---

    async fn list_digital_assets(
        &self,
        filter: DigitalAssetFilter,
    ) -> StoreResult<Page<DigitalAsset>> {
        let page = Pagination::new(filter.page, filter.limit);
        self.fetch_page(
            DIGITAL_ASSET_COLUMNS,
            "digital_assets",
            |b| {
                b.push(" AND is_active = 1");
                if let Some(search) = &filter.search {
                    b.push(" AND (name LIKE ");
                    b.push_bind(like(search));
                    b.push(" OR description LIKE ");
                    b.push_bind(like(search));
                    b.push(" OR file_name LIKE ");
                    b.push_bind(like(search));
                    b.push(")");
                }
                if let Some(kind) = filter.kind {
                    b.push(" AND kind = ");
                    b.push_bind(kind);
                }
                if let Some(department_id) = filter.department_id {
                    b.push(" AND department_id = ");
                    b.push_bind(department_id);
                }
            },
            "created_at DESC",
            page,
        )
        .await
    }

    async fn get_digital_asset(&self, id: Uuid) -> StoreResult<Option<DigitalAsset>> {
        let sql = format!(
            "SELECT {DIGITAL_ASSET_COLUMNS} FROM digital_assets WHERE id = ? AND is_active = 1"
        );
        Ok(sqlx::query_as::<_, DigitalAsset>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_digital_asset(
        &self,
        req: CreateDigitalAssetRequest,
        kind: DigitalAssetKind,
        compressed_size: i64,
        uploaded_by: Uuid,
    ) -> StoreResult<DigitalAsset> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO digital_assets (id, name, description, kind, file_name, file_key, \
             mime_type, file_size, compressed_size, department_id, is_active, uploaded_by, \
             created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?) RETURNING {DIGITAL_ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, DigitalAsset>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name.trim())
            .bind(req.description)
            .bind(kind)
            .bind(req.file_name)
            .bind(req.file_key)
            .bind(req.mime_type)
            .bind(req.file_size)
            .bind(compressed_size)
            .bind(req.department_id)
            .bind(uploaded_by)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "digital asset already exists"))
    }

    async fn update_digital_asset(
        &self,
        id: Uuid,
        req: UpdateDigitalAssetRequest,
    ) -> StoreResult<DigitalAsset> {
        let sql = format!(
            "UPDATE digital_assets SET name = COALESCE(?, name), \
             description = COALESCE(?, description), kind = COALESCE(?, kind), \
             department_id = COALESCE(?, department_id), updated_at = ? \
             WHERE id = ? AND is_active = 1 RETURNING {DIGITAL_ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, DigitalAsset>(&sql)
            .bind(req.name)
            .bind(req.description)
            .bind(req.kind)
            .bind(req.department_id)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "digital asset update conflicts with existing data"))?
            .ok_or_else(|| StoreError::NotFound("digital asset".into()))
    }

    async fn deactivate_digital_asset(&self, id: Uuid) -> StoreResult<DigitalAsset> {
        let sql = format!(
            "UPDATE digital_assets SET is_active = 0, updated_at = ? WHERE id = ? \
             AND is_active = 1 RETURNING {DIGITAL_ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, DigitalAsset>(&sql)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("digital asset".into()))
    }

    // --- AUDIT ---

    async fn insert_audit_log(&self, entry: NewAuditLog) -> StoreResult<i64> {
        let result = sqlx::query(
            "INSERT INTO audit_logs (action, entity_type, entity_id, actor_id, old_values, \
             new_values, ip_address, user_agent, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.actor_id)
        .bind(entry.old_values)
        .bind(entry.new_values)
        .bind(entry.ip_address)
        .bind(entry.user_agent)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_audit_logs(&self, filter: AuditLogFilter) -> StoreResult<Page<AuditLog>> {
        let page = Pagination::new(filter.page, filter.limit);
        self.fetch_page(
            AUDIT_COLUMNS,
            "audit_logs",
            |b| {
                if let Some(entity_type) = &filter.entity_type {
                    b.push(" AND entity_type = ");
                    b.push_bind(entity_type.to_uppercase());
                }
                if let Some(entity_id) = &filter.entity_id {
                    b.push(" AND entity_id = ");
                    b.push_bind(entity_id.clone());
                }
                if let Some(actor_id) = filter.actor_id {
                    b.push(" AND actor_id = ");
                    b.push_bind(actor_id);
                }
                if let Some(action) = filter.action {
                    b.push(" AND action = ");
                    b.push_bind(action);
                }
            },
            "id DESC",
            page,
        )
        .await
    }

    // --- DASHBOARD ---

    async fn dashboard_stats(&self, recent_limit: i64) -> StoreResult<DashboardStats> {
        let total_assets: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;
        let assets_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM assets WHERE is_active = 1 \
             GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        let (total_documents, document_bytes, document_saved): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(file_size), 0), \
             COALESCE(SUM(file_size - compressed_size), 0) FROM documents WHERE is_active = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        let (total_digital_assets, digital_bytes, digital_saved): (i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*), COALESCE(SUM(file_size), 0), \
                 COALESCE(SUM(file_size - compressed_size), 0) FROM digital_assets \
                 WHERE is_active = 1",
            )
            .fetch_one(&self.pool)
            .await?;
        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        let total_departments: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM departments WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;
        let sql = format!("SELECT {AUDIT_COLUMNS} FROM audit_logs ORDER BY id DESC LIMIT ?");
        let recent_activity = sqlx::query_as::<_, AuditLog>(&sql)
            .bind(recent_limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_assets,
            assets_by_status,
            total_documents,
            total_digital_assets,
            total_users,
            total_departments,
            stored_bytes: document_bytes + digital_bytes,
            saved_bytes: document_saved + digital_saved,
            recent_activity,
        })
    }

    // --- SETTINGS ---

    async fn get_backup_settings(&self) -> StoreResult<BackupSettings> {
        let sql = format!("SELECT {BACKUP_SETTINGS_COLUMNS} FROM backup_settings WHERE id = 1");
        Ok(sqlx::query_as::<_, BackupSettings>(&sql)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_backup_settings(
        &self,
        req: UpdateBackupSettingsRequest,
    ) -> StoreResult<BackupSettings> {
        let sql = format!(
            "UPDATE backup_settings SET enabled = ?, schedule_time = ?, retention_days = ?, \
             updated_at = ? WHERE id = 1 RETURNING {BACKUP_SETTINGS_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, BackupSettings>(&sql)
            .bind(req.enabled)
            .bind(req.schedule_time)
            .bind(req.retention_days)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn mark_backup_completed(&self, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE backup_settings SET last_backup_at = ? WHERE id = 1")
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_ai_settings(&self) -> StoreResult<AiSettings> {
        let sql = format!("SELECT {AI_SETTINGS_COLUMNS} FROM ai_settings WHERE id = 1");
        Ok(sqlx::query_as::<_, AiSettings>(&sql)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_ai_settings(&self, req: UpdateAiSettingsRequest) -> StoreResult<AiSettings> {
        let current = self.get_ai_settings().await?;
        let api_key = match req.api_key {
            None => current.api_key,
            Some(key) if key.trim().is_empty() => None,
            Some(key) => Some(key.trim().to_string()),
        };
        let sql = format!(
            "UPDATE ai_settings SET enabled = ?, provider = ?, model = ?, api_key = ?, \
             base_url = ?, temperature = ?, max_tokens = ?, updated_at = ? WHERE id = 1 \
             RETURNING {AI_SETTINGS_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, AiSettings>(&sql)
            .bind(req.enabled)
            .bind(req.provider)
            .bind(req.model)
            .bind(api_key)
            .bind(req.base_url)
            .bind(req.temperature)
            .bind(req.max_tokens)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?)
    }

    // --- MAINTENANCE ---

    async fn snapshot_to(&self, dest: &Path) -> StoreResult<()> {
        let dest = dest
            .to_str()
            .ok_or_else(|| StoreError::Unexpected(anyhow::anyhow!("backup path is not UTF-8")))?;
        sqlx::query("VACUUM INTO ?")
            .bind(dest)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
