use std::{env, path::PathBuf};

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// cloned into the shared `AppState`; handlers pull it through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local `x-user-id` bypass and log format.
    pub env: Env,
    // SQLite connection string, e.g. `sqlite://data/assets.db`.
    pub db_url: String,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Secret key used to sign and validate JWTs (HS256).
    pub jwt_secret: String,
    // Token lifetime in hours.
    pub jwt_expiry_hours: i64,
    // S3-compatible storage for document and digital asset files.
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    pub s3_bucket: String,
    // Directory that receives database backups.
    pub backup_dir: PathBuf,
    // bcrypt work factor for password hashes.
    pub bcrypt_cost: u32,
    // Lifetime and size of the department permission cache.
    pub permission_cache_ttl_secs: u64,
    pub permission_cache_capacity: usize,
}

/// Env
///
/// Defines the runtime context: `Local` enables development conveniences (bucket
/// provisioning, header bypass, pretty logs), `Production` demands explicit secrets.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "local-development-jwt-secret-value";

impl Default for AppConfig {
    /// Safe, non-panicking values used for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "assets-test".to_string(),
            backup_dir: PathBuf::from("backups"),
            bcrypt_cost: 4,
            permission_cache_ttl_secs: 60,
            permission_cache_capacity: 256,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables. Implements the fail-fast
    /// principle for production.
    ///
    /// # Panics
    /// Panics in `Env::Production` when `JWT_SECRET`, `DATABASE_URL`, `S3_ENDPOINT`,
    /// `S3_ACCESS_KEY` or `S3_SECRET_KEY` is not set.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_expiry_hours = parse_var("JWT_EXPIRY_HOURS", 24);
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let backup_dir =
            PathBuf::from(env::var("BACKUP_DIR").unwrap_or_else(|_| "backups".to_string()));
        let bcrypt_cost = parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST);
        let permission_cache_ttl_secs = parse_var("PERMISSION_CACHE_TTL_SECS", 60);
        let permission_cache_capacity = parse_var("PERMISSION_CACHE_CAPACITY", 256);
        let s3_region = env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let s3_bucket = env::var("S3_BUCKET").unwrap_or_else(|_| "asset-files".to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/assets.db".to_string()),
                bind_addr,
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                jwt_expiry_hours,
                // Local storage (MinIO) uses known default credentials.
                s3_endpoint: env::var("S3_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:9000".to_string()),
                s3_region,
                s3_key: env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "admin".to_string()),
                s3_secret: env::var("S3_SECRET_KEY").unwrap_or_else(|_| "password".to_string()),
                s3_bucket,
                backup_dir,
                bcrypt_cost,
                permission_cache_ttl_secs,
                permission_cache_capacity,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: env::var("DATABASE_URL")
                    .expect("FATAL: DATABASE_URL required in production"),
                bind_addr,
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                jwt_expiry_hours,
                s3_endpoint: env::var("S3_ENDPOINT")
                    .expect("FATAL: S3_ENDPOINT required in production"),
                s3_region,
                s3_key: env::var("S3_ACCESS_KEY")
                    .expect("FATAL: S3_ACCESS_KEY required in production"),
                s3_secret: env::var("S3_SECRET_KEY")
                    .expect("FATAL: S3_SECRET_KEY required in production"),
                s3_bucket,
                backup_dir,
                bcrypt_cost,
                permission_cache_ttl_secs,
                permission_cache_capacity,
            },
        }
    }
}

/// Reads a numeric variable, falling back to `default` when unset or unparsable.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "ignoring unparsable value");
            default
        }),
        Err(_) => default,
    }
}
