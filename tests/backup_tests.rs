use asset_manager::{
    BackupService, SqliteRepository,
    backup::{BackupError, MAX_RETENTION_DAYS, backup_name, scheduler::run_due_backup},
    models::{Role, UpdateBackupSettingsRequest},
    repository::{NewUser, Repository, RepositoryState},
};
use chrono::{Duration, TimeZone, Utc};
use std::{
    fs::File,
    sync::Arc,
    time::{Duration as StdDuration, SystemTime},
};
use tempfile::TempDir;

// --- Setup ---

async fn service_in(dir: &TempDir) -> BackupService {
    let repo = SqliteRepository::in_memory()
        .await
        .expect("Failed to open in-memory database");
    repo.create_user(NewUser {
        email: "backup@example.com".into(),
        name: "Backup".into(),
        password_hash: "x".into(),
        role: Role::Admin,
        department_id: None,
    })
    .await
    .unwrap();
    BackupService::new(Arc::new(repo) as RepositoryState, dir.path())
}

/// Drops a file with a valid backup name and an mtime `age` in the past.
fn plant_backup(dir: &TempDir, name: &str, age: StdDuration) {
    let file = File::create(dir.path().join(name)).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

const DAY: StdDuration = StdDuration::from_secs(24 * 60 * 60);

// --- Tests ---

#[tokio::test]
async fn test_create_backup_writes_a_readable_snapshot() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir).await;
    let at = Utc.with_ymd_and_hms(2026, 3, 14, 2, 0, 5).unwrap();

    let backup = service.create_backup_at(at).await.unwrap();
    assert_eq!(backup.name, "backup-20260314-020005.db");
    assert!(backup.size > 0);

    // The snapshot is a complete database.
    let url = format!("sqlite://{}", dir.path().join(&backup.name).display());
    let restored = SqliteRepository::connect(&url, 1).await.unwrap();
    let user = restored.get_user_by_email("backup@example.com").await.unwrap();
    assert!(user.is_some());

    let settings = service.repo().get_backup_settings().await.unwrap();
    assert_eq!(settings.last_backup_at, Some(at));

    let again = service.create_backup_at(at).await;
    assert!(matches!(again, Err(BackupError::AlreadyExists(_))));
}

#[tokio::test]
async fn test_list_ignores_foreign_files_and_sorts_newest_first() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir).await;

    plant_backup(&dir, "backup-20260101-000000.db", DAY * 3);
    plant_backup(&dir, "backup-20260102-000000.db", DAY);
    plant_backup(&dir, "notes.txt", DAY);
    plant_backup(&dir, "backup-latest.db", DAY);

    let names: Vec<String> = service
        .list_backups()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(
        names,
        vec!["backup-20260102-000000.db", "backup-20260101-000000.db"]
    );
}

#[tokio::test]
async fn test_list_of_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let repo = SqliteRepository::in_memory().await.unwrap();
    let service = BackupService::new(Arc::new(repo) as RepositoryState, dir.path().join("absent"));
    assert!(service.list_backups().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_validates_names() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir).await;
    plant_backup(&dir, "backup-20260101-000000.db", DAY);

    let traversal = service.delete_backup("../backup-20260101-000000.db").await;
    assert!(matches!(traversal, Err(BackupError::InvalidName(_))));

    let missing = service.delete_backup("backup-20250101-000000.db").await;
    assert!(matches!(missing, Err(BackupError::NotFound(_))));

    service.delete_backup("backup-20260101-000000.db").await.unwrap();
    assert!(!dir.path().join("backup-20260101-000000.db").exists());
}

#[tokio::test]
async fn test_cleanup_removes_only_expired_backups() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir).await;
    plant_backup(&dir, "backup-20260101-000000.db", DAY * 10);
    plant_backup(&dir, "backup-20260105-000000.db", DAY * 8);
    plant_backup(&dir, "backup-20260110-000000.db", DAY * 2);
    plant_backup(&dir, "keep-me.db", DAY * 30);

    let deleted = service.cleanup(7, Utc::now()).await.unwrap();
    assert_eq!(
        deleted,
        vec!["backup-20260101-000000.db", "backup-20260105-000000.db"]
    );
    assert!(dir.path().join("backup-20260110-000000.db").exists());
    assert!(dir.path().join("keep-me.db").exists());
}

#[tokio::test]
async fn test_cleanup_rejects_out_of_range_retention() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir).await;
    plant_backup(&dir, "backup-20260101-000000.db", DAY * 10);

    for days in [0, -1, MAX_RETENTION_DAYS + 1, i64::MAX] {
        let result = service.cleanup(days, Utc::now()).await;
        assert!(matches!(result, Err(BackupError::InvalidRetention(d)) if d == days), "{days}");
    }
    assert!(dir.path().join("backup-20260101-000000.db").exists());

    let deleted = service.cleanup(MAX_RETENTION_DAYS, Utc::now()).await.unwrap();
    assert!(deleted.is_empty());
}

#[tokio::test]
async fn test_scheduled_run_happens_once_per_window() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir).await;
    let now = Utc::now();

    // Disabled by default.
    assert!(run_due_backup(&service, now).await.unwrap().is_none());

    service
        .repo()
        .update_backup_settings(UpdateBackupSettingsRequest {
            enabled: true,
            schedule_time: now.format("%H:%M").to_string(),
            retention_days: 7,
        })
        .await
        .unwrap();
    plant_backup(&dir, "backup-20200101-000000.db", DAY * 30);

    let (backup, report) = run_due_backup(&service, now).await.unwrap().unwrap();
    assert_eq!(backup.name, backup_name(now));
    assert_eq!(report.deleted, vec!["backup-20200101-000000.db"]);

    let later = now + Duration::minutes(1);
    assert!(run_due_backup(&service, later).await.unwrap().is_none());
}
