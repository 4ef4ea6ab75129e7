//! Database backups.
//!
//! A backup is a consistent snapshot of the SQLite database (`VACUUM INTO`)
//! written to `BACKUP_DIR` as `backup-YYYYMMDD-HHMMSS.db`. Only names matching
//! that pattern are ever listed, deleted or cleaned up.
use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use thiserror::Error;

use crate::{
    models::BackupFile,
    repository::{RepositoryState, StoreError},
};

pub mod scheduler;

pub use scheduler::spawn_backup_scheduler;

const NAME_PREFIX: &str = "backup-";
const NAME_SUFFIX: &str = ".db";
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Upper bound for any retention period, about ten years.
pub const MAX_RETENTION_DAYS: i64 = 3650;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("invalid backup name: {0}")]
    InvalidName(String),
    #[error("backup not found: {0}")]
    NotFound(String),
    #[error("backup already exists: {0}")]
    AlreadyExists(String),
    #[error("retention must be between 1 and {MAX_RETENTION_DAYS} days, got {0}")]
    InvalidRetention(i64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type BackupResult<T> = Result<T, BackupError>;

pub fn backup_name(at: DateTime<Utc>) -> String {
    format!("{NAME_PREFIX}{}{NAME_SUFFIX}", at.format(STAMP_FORMAT))
}

/// True only for names produced by `backup_name`.
pub fn is_valid_backup_name(name: &str) -> bool {
    name.strip_prefix(NAME_PREFIX)
        .and_then(|rest| rest.strip_suffix(NAME_SUFFIX))
        .is_some_and(|stamp| {
            stamp.len() == 15 && NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).is_ok()
        })
}

#[derive(Clone)]
pub struct BackupService {
    repo: RepositoryState,
    dir: PathBuf,
}

impl BackupService {
    pub fn new(repo: RepositoryState, dir: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn repo(&self) -> &RepositoryState {
        &self.repo
    }

    pub async fn create_backup(&self) -> BackupResult<BackupFile> {
        self.create_backup_at(Utc::now()).await
    }

    /// Snapshots the database into `backup_name(at)` and records `last_backup_at`.
    pub async fn create_backup_at(&self, at: DateTime<Utc>) -> BackupResult<BackupFile> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = backup_name(at);
        let path = self.dir.join(&name);
        if tokio::fs::try_exists(&path).await? {
            return Err(BackupError::AlreadyExists(name));
        }

        self.repo.snapshot_to(&path).await?;
        self.repo.mark_backup_completed(at).await?;

        let size = tokio::fs::metadata(&path).await?.len();
        tracing::info!(backup = %name, size, "database backup written");
        Ok(BackupFile {
            name,
            size,
            created_at: at,
        })
    }

    /// Newest first. A missing directory yields an empty list.
    pub async fn list_backups(&self) -> BackupResult<Vec<BackupFile>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_valid_backup_name(&name) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            backups.push(BackupFile {
                name,
                size: meta.len(),
                created_at: modified_at(meta.modified()?),
            });
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.name.cmp(&a.name)));
        Ok(backups)
    }

    pub async fn delete_backup(&self, name: &str) -> BackupResult<()> {
        if !is_valid_backup_name(name) {
            return Err(BackupError::InvalidName(name.to_string()));
        }
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                tracing::info!(backup = %name, "backup deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BackupError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// cleanup
    ///
    /// Deletes backups whose modification time is older than `retention_days`
    /// before `now`. Returns the deleted names. `retention_days` must lie in
    /// `1..=MAX_RETENTION_DAYS`.
    pub async fn cleanup(&self, retention_days: i64, now: DateTime<Utc>) -> BackupResult<Vec<String>> {
        if !(1..=MAX_RETENTION_DAYS).contains(&retention_days) {
            return Err(BackupError::InvalidRetention(retention_days));
        }
        let cutoff = now - Duration::days(retention_days);
        let mut deleted = Vec::new();
        for backup in self.list_backups().await? {
            if backup.created_at >= cutoff {
                continue;
            }
            match tokio::fs::remove_file(self.dir.join(&backup.name)).await {
                Ok(()) => deleted.push(backup.name),
                Err(e) => {
                    tracing::warn!(backup = %backup.name, error = %e, "failed to remove expired backup")
                }
            }
        }
        if !deleted.is_empty() {
            tracing::info!(count = deleted.len(), retention_days, "expired backups removed");
        }
        deleted.sort();
        Ok(deleted)
    }
}

fn modified_at(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn name_matches_timestamp_pattern() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 2, 0, 5).unwrap();
        let name = backup_name(at);
        assert_eq!(name, "backup-20240309-020005.db");
        assert!(is_valid_backup_name(&name));
    }

    #[test]
    fn traversal_and_foreign_names_are_rejected() {
        for bad in [
            "../backup-20240309-020005.db",
            "backup-20240309-020005.db/../../etc/passwd",
            "backup-20241309-020005.db",
            "backup-latest.db",
            "assets.db",
            "",
        ] {
            assert!(!is_valid_backup_name(bad), "{bad}");
        }
    }
}
