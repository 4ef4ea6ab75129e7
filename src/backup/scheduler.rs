//! Automatic daily backups.
//!
//! A background task wakes every `TICK`, reloads `backup_settings`, and runs a
//! backup when the current time is within `WINDOW` of `schedule_time` and no
//! backup was recorded for this window yet. Retention cleanup follows every
//! scheduled backup.
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use tokio::task::JoinHandle;

use super::{BackupResult, BackupService};
use crate::models::{BackupCleanupReport, BackupFile, BackupSettings};

pub const TICK: StdDuration = StdDuration::from_secs(60);
pub const WINDOW_MINUTES: i64 = 5;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Parses `HH:MM` (24h).
pub fn parse_schedule_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

/// True when `now` is at most `WINDOW_MINUTES` away from `schedule`, wrapping
/// around midnight.
pub fn is_within_window(now: DateTime<Utc>, schedule: NaiveTime) -> bool {
    let now_secs = i64::from(now.time().num_seconds_from_midnight());
    let target = i64::from(schedule.num_seconds_from_midnight());
    let diff = (now_secs - target).rem_euclid(SECONDS_PER_DAY);
    let distance = diff.min(SECONDS_PER_DAY - diff);
    distance <= WINDOW_MINUTES * 60
}

/// A backup taken less than one full window width ago belongs to the current window.
pub fn already_ran(last_backup_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_backup_at.is_some_and(|last| {
        let age = now - last;
        age >= Duration::zero() && age <= Duration::minutes(2 * WINDOW_MINUTES)
    })
}

pub fn should_run(settings: &BackupSettings, now: DateTime<Utc>) -> bool {
    if !settings.enabled {
        return false;
    }
    let Some(schedule) = parse_schedule_time(&settings.schedule_time) else {
        tracing::warn!(schedule_time = %settings.schedule_time, "invalid backup schedule");
        return false;
    };
    is_within_window(now, schedule) && !already_ran(settings.last_backup_at, now)
}

/// One scheduler step. Returns the backup and cleanup report when a backup ran.
pub async fn run_due_backup(
    service: &BackupService,
    now: DateTime<Utc>,
) -> BackupResult<Option<(BackupFile, BackupCleanupReport)>> {
    let settings = service.repo().get_backup_settings().await?;
    if !should_run(&settings, now) {
        tracing::debug!(enabled = settings.enabled, "no scheduled backup due");
        return Ok(None);
    }

    let backup = service.create_backup_at(now).await?;
    let deleted = service.cleanup(settings.retention_days, now).await?;
    Ok(Some((backup, BackupCleanupReport { deleted })))
}

/// spawn_backup_scheduler
///
/// Best-effort loop; a failed run is logged and retried on the next tick that is
/// still inside the window.
pub fn spawn_backup_scheduler(service: BackupService) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match run_due_backup(&service, Utc::now()).await {
                Ok(Some((backup, report))) => tracing::info!(
                    backup = %backup.name,
                    removed = report.deleted.len(),
                    "scheduled backup completed"
                ),
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "scheduled backup failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn settings(enabled: bool, time: &str, last: Option<DateTime<Utc>>) -> BackupSettings {
        BackupSettings {
            enabled,
            schedule_time: time.into(),
            retention_days: 7,
            last_backup_at: last,
            updated_at: at(0, 0),
        }
    }

    #[test]
    fn schedule_time_requires_hh_mm() {
        assert_eq!(parse_schedule_time("02:30"), NaiveTime::from_hms_opt(2, 30, 0));
        assert_eq!(parse_schedule_time("2:30"), None);
        assert_eq!(parse_schedule_time("24:00"), None);
        assert_eq!(parse_schedule_time("02:30:00"), None);
    }

    #[test]
    fn window_is_five_minutes_either_side() {
        let two = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
        assert!(is_within_window(at(1, 55), two));
        assert!(is_within_window(at(2, 5), two));
        assert!(!is_within_window(at(2, 6), two));
        assert!(!is_within_window(at(1, 54), two));
    }

    #[test]
    fn window_wraps_midnight() {
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert!(is_within_window(at(23, 57), midnight));
        assert!(is_within_window(at(0, 3), midnight));
        assert!(!is_within_window(at(23, 50), midnight));
    }

    #[test]
    fn runs_once_per_window() {
        assert!(should_run(&settings(true, "02:00", None), at(2, 1)));
        assert!(!should_run(&settings(false, "02:00", None), at(2, 1)));
        assert!(!should_run(&settings(true, "02:00", Some(at(1, 58))), at(2, 3)));
        // Yesterday's run does not block today.
        let yesterday = at(2, 0) - Duration::days(1);
        assert!(should_run(&settings(true, "02:00", Some(yesterday)), at(2, 0)));
        assert!(!should_run(&settings(true, "bad", None), at(2, 0)));
    }
}
