use asset_manager::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic, path::PathBuf};

// --- Setup/Teardown Utilities ---

/// Runs `test` and restores the listed environment variables afterwards.
fn run_with_env<T, R>(test: T, cleanup_vars: Vec<&'static str>) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(String, Option<String>)> = cleanup_vars
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

const CONFIG_VARS: [&str; 11] = [
    "APP_ENV",
    "DATABASE_URL",
    "JWT_SECRET",
    "JWT_EXPIRY_HOURS",
    "S3_ENDPOINT",
    "S3_ACCESS_KEY",
    "S3_SECRET_KEY",
    "BACKUP_DIR",
    "BCRYPT_COST",
    "PERMISSION_CACHE_TTL_SECS",
    "BIND_ADDR",
];

fn clear_config_vars() {
    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    let result = run_with_env(
        || {
            panic::catch_unwind(|| {
                clear_config_vars();
                unsafe {
                    env::set_var("APP_ENV", "production");
                    env::set_var("DATABASE_URL", "sqlite:///var/lib/assets/assets.db");
                    env::set_var("S3_ENDPOINT", "https://s3.example.com");
                }
                // JWT_SECRET and the S3 credentials are missing
                AppConfig::load()
            })
        },
        CONFIG_VARS.to_vec(),
    );

    assert!(
        result.is_err(),
        "Production config loading should panic on missing secrets"
    );
}

#[test]
#[serial]
fn test_app_config_production_with_all_secrets() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("DATABASE_URL", "sqlite:///var/lib/assets/assets.db");
                env::set_var("JWT_SECRET", "prod-secret");
                env::set_var("S3_ENDPOINT", "https://s3.example.com");
                env::set_var("S3_ACCESS_KEY", "key");
                env::set_var("S3_SECRET_KEY", "secret");
            }
            AppConfig::load()
        },
        CONFIG_VARS.to_vec(),
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.jwt_secret, "prod-secret");
    assert_eq!(config.db_url, "sqlite:///var/lib/assets/assets.db");
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "local");
            }
            AppConfig::load()
        },
        CONFIG_VARS.to_vec(),
    );

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.db_url, "sqlite://data/assets.db");
    // MinIO defaults
    assert_eq!(config.s3_endpoint, "http://localhost:9000");
    assert_eq!(config.s3_key, "admin");
    assert_eq!(config.jwt_expiry_hours, 24);
    assert_eq!(config.backup_dir, PathBuf::from("backups"));
    assert!(!config.jwt_secret.is_empty());
}

#[test]
#[serial]
fn test_app_config_numeric_overrides_and_bad_values() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("JWT_EXPIRY_HOURS", "8");
                env::set_var("BCRYPT_COST", "not-a-number");
                env::set_var("PERMISSION_CACHE_TTL_SECS", " 15 ");
                env::set_var("BACKUP_DIR", "/srv/backups");
            }
            AppConfig::load()
        },
        CONFIG_VARS.to_vec(),
    );

    assert_eq!(config.jwt_expiry_hours, 8);
    assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    assert_eq!(config.permission_cache_ttl_secs, 15);
    assert_eq!(config.backup_dir, PathBuf::from("/srv/backups"));
}
