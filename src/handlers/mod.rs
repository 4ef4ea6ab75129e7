//! HTTP handlers, one module per resource.
//!
//! Every handler follows the same shape: resolve the caller (`AuthUser`), gate
//! on role or department permission, validate, call the repository, record an
//! audit entry for mutations, and answer with JSON.
use crate::error::{ApiResult, api_validation_error};

pub mod ai_settings;
pub mod assets;
pub mod audit;
pub mod auth;
pub mod backup;
pub mod dashboard;
pub mod departments;
pub mod digital_assets;
pub mod documents;
pub mod uploads;
pub mod users;

/// Entity names written to `audit_logs.entity_type`.
pub mod entity {
    pub const USER: &str = "USER";
    pub const DEPARTMENT: &str = "DEPARTMENT";
    pub const PERMISSION: &str = "DEPARTMENT_PERMISSION";
    pub const ASSET: &str = "ASSET";
    pub const DOCUMENT: &str = "DOCUMENT";
    pub const DIGITAL_ASSET: &str = "DIGITAL_ASSET";
    pub const BACKUP: &str = "BACKUP";
    pub const BACKUP_SETTINGS: &str = "BACKUP_SETTINGS";
    pub const AI_SETTINGS: &str = "AI_SETTINGS";
}

/// Rejects empty or whitespace-only required text.
pub(crate) fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(api_validation_error(&format!("{field} must not be empty")));
    }
    Ok(())
}

/// Like `require_text`, for optional fields of partial updates.
pub(crate) fn require_text_if_present(field: &str, value: Option<&str>) -> ApiResult<()> {
    match value {
        Some(v) => require_text(field, v),
        None => Ok(()),
    }
}

pub(crate) fn require_file_size(size: i64) -> ApiResult<()> {
    if size < 0 {
        return Err(api_validation_error("file_size must not be negative"));
    }
    Ok(())
}

/// Object keys must come from `POST /upload/presigned` for the matching kind.
pub(crate) fn require_object_key(key: &str, prefix: &str) -> ApiResult<()> {
    let clean = crate::storage::sanitize_key(key);
    if clean != key || !key.starts_with(&format!("{prefix}/")) || key.len() <= prefix.len() + 1 {
        return Err(api_validation_error(&format!(
            "file_key must be an uploaded object under {prefix}/"
        )));
    }
    Ok(())
}
