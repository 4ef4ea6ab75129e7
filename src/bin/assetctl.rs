//! Maintenance commands that run against the database outside the HTTP server.
use std::{sync::Arc, time::Duration};

use anyhow::{Context, bail};
use asset_manager::{
    AppConfig, BackupService, PermissionService,
    audit::{self, AuditContext, AuditEvent},
    auth::{AuthUser, MIN_PASSWORD_LEN, hash_password},
    backup::MAX_RETENTION_DAYS,
    handlers::entity,
    models::{AuditAction, Module, Role},
    repository::{NewUser, RepositoryState, SqliteRepository},
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "assetctl", version, about = "Asset manager maintenance commands")]
struct Cli {
    /// Overrides DATABASE_URL.
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Creates an ADMIN account.
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// Department code to attach the account to.
        #[arg(long)]
        department: Option<String>,
    },
    /// Sets a new password for an existing account.
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Prints the resolved read/write/delete flags of a user on a module.
    CheckPermissions {
        #[arg(long)]
        email: String,
        #[arg(long)]
        module: String,
    },
    /// Writes a backup now and applies retention.
    Backup,
    /// Deletes backups older than the retention period.
    CleanupBackups {
        /// Defaults to the stored backup settings.
        #[arg(long)]
        retention_days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "asset_manager=info,assetctl=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load();
    if let Some(url) = cli.database_url {
        config.db_url = url;
    }

    let repo = SqliteRepository::connect(&config.db_url, 1)
        .await
        .with_context(|| format!("opening database {}", config.db_url))?;
    let repo = Arc::new(repo) as RepositoryState;

    match cli.command {
        Command::CreateAdmin {
            email,
            name,
            password,
            department,
        } => create_admin(&repo, &config, email, name, password, department).await,
        Command::ResetPassword { email, password } => {
            reset_password(&repo, &config, &email, &password).await
        }
        Command::CheckPermissions { email, module } => {
            check_permissions(&repo, &config, &email, &module).await
        }
        Command::Backup => {
            let service = BackupService::new(repo.clone(), config.backup_dir.clone());
            let backup = service.create_backup().await?;
            println!("{} ({} bytes)", backup.name, backup.size);
            let retention = repo.get_backup_settings().await?.retention_days;
            for name in service.cleanup(retention, Utc::now()).await? {
                println!("removed {name}");
            }
            Ok(())
        }
        Command::CleanupBackups { retention_days } => {
            let retention = match retention_days {
                Some(days) => checked_retention(days)?,
                None => repo.get_backup_settings().await?.retention_days,
            };
            let service = BackupService::new(repo.clone(), config.backup_dir.clone());
            let deleted = service.cleanup(retention, Utc::now()).await?;
            for name in &deleted {
                println!("removed {name}");
            }
            println!("{} backup(s) older than {retention} day(s) removed", deleted.len());
            Ok(())
        }
    }
}

fn checked_retention(days: i64) -> anyhow::Result<i64> {
    if !(1..=MAX_RETENTION_DAYS).contains(&days) {
        bail!("--retention-days must be between 1 and {MAX_RETENTION_DAYS}");
    }
    Ok(days)
}

/// Audit context for changes made from the command line.
fn cli_context() -> AuditContext {
    AuditContext {
        ip_address: None,
        user_agent: Some(format!("assetctl/{}", env!("CARGO_PKG_VERSION"))),
    }
}

async fn create_admin(
    repo: &RepositoryState,
    config: &AppConfig,
    email: String,
    name: String,
    password: String,
    department: Option<String>,
) -> anyhow::Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {MIN_PASSWORD_LEN} characters");
    }
    let department_id = match department {
        Some(code) => {
            let code = code.trim().to_ascii_uppercase();
            let found = repo
                .list_departments()
                .await?
                .into_iter()
                .find(|d| d.code == code)
                .with_context(|| format!("no active department with code {code}"))?;
            Some(found.id)
        }
        None => None,
    };

    let password_hash = hash_password(&password, config.bcrypt_cost).await?;
    let user = repo
        .create_user(NewUser {
            email: email.trim().to_lowercase(),
            name: name.trim().to_string(),
            password_hash,
            role: Role::Admin,
            department_id,
        })
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "admin account created");
    println!("created admin {} ({})", user.email, user.id);
    Ok(())
}

async fn reset_password(
    repo: &RepositoryState,
    config: &AppConfig,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {MIN_PASSWORD_LEN} characters");
    }
    let user = repo
        .get_user_by_email(email.trim())
        .await?
        .with_context(|| format!("no user with email {email}"))?;
    let password_hash = hash_password(password, config.bcrypt_cost).await?;
    repo.set_password(user.id, &password_hash).await?;

    audit::record(
        repo.as_ref(),
        AuditEvent::new(AuditAction::PasswordReset, entity::USER)
            .entity(user.id)
            .context(&cli_context()),
    )
    .await;

    tracing::info!(user_id = %user.id, "password reset from the command line");
    println!("password updated for {}", user.email);
    Ok(())
}

async fn check_permissions(
    repo: &RepositoryState,
    config: &AppConfig,
    email: &str,
    module: &str,
) -> anyhow::Result<()> {
    let Some(module) = Module::parse(module) else {
        let known: Vec<&str> = Module::ALL.iter().map(Module::as_str).collect();
        bail!("unknown module {module}; expected one of {}", known.join(", "));
    };
    let user = repo
        .get_user_by_email(email.trim())
        .await?
        .with_context(|| format!("no user with email {email}"))?;
    if !user.is_active {
        println!("note: {} is deactivated and cannot sign in", user.email);
    }

    let permissions = PermissionService::new(
        repo.clone(),
        config.permission_cache_capacity,
        Duration::from_secs(config.permission_cache_ttl_secs),
    );
    let set = permissions
        .check_user_permissions(&AuthUser::from(user.clone()), module)
        .await?;

    println!(
        "{} [{:?}] on {}: read={} write={} delete={}",
        user.email,
        user.role,
        module.as_str(),
        set.can_read,
        set.can_write,
        set.can_delete
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_manager::models::AuditLogFilter;

    #[test]
    fn retention_flag_is_bounded() {
        assert_eq!(checked_retention(7).unwrap(), 7);
        assert_eq!(checked_retention(MAX_RETENTION_DAYS).unwrap(), MAX_RETENTION_DAYS);
        assert!(checked_retention(0).is_err());
        assert!(checked_retention(i64::MAX).is_err());
    }

    #[tokio::test]
    async fn reset_password_is_audited() {
        let repo = Arc::new(SqliteRepository::in_memory().await.unwrap()) as RepositoryState;
        let config = AppConfig::default();
        let user = repo
            .create_user(NewUser {
                email: "ops@example.com".into(),
                name: "Ops".into(),
                password_hash: "x".into(),
                role: Role::User,
                department_id: None,
            })
            .await
            .unwrap();

        reset_password(&repo, &config, "ops@example.com", "fresh-password")
            .await
            .unwrap();

        let logs = repo
            .list_audit_logs(AuditLogFilter {
                action: Some(AuditAction::PasswordReset),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(logs.total, 1);
        assert_eq!(logs.items[0].entity_id.as_deref(), Some(user.id.to_string().as_str()));
        assert!(logs.items[0].user_agent.as_deref().is_some_and(|ua| ua.starts_with("assetctl/")));
    }
}
