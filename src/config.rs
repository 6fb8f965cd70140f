use std::env;
use std::str::FromStr;

use chrono::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;
const DEFAULT_MAX_CONNECTIONS: u32 = 100;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173,http://localhost:8080";
const DEFAULT_CORS_MAX_AGE_SECS: usize = 12 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the server needs at startup, read once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub cloudinary: CloudinaryConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret for access tokens. Never empty.
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout_secs: u64,
}

/// Browser origins allowed to call the API with credentials.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub max_age_secs: usize,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Required | Default                      |
    /// |---------------------------|----------|------------------------------|
    /// | `DATABASE_URL`            | yes      | --                           |
    /// | `JWT_SECRET`              | yes      | --                           |
    /// | `JWT_ACCESS_EXPIRY_MINS`  | no       | `15`                         |
    /// | `JWT_REFRESH_EXPIRY_DAYS` | no       | `7`                          |
    /// | `HOST`                    | no       | `127.0.0.1`                  |
    /// | `PORT`                    | no       | `8080`                       |
    /// | `DB_MAX_CONNECTIONS`      | no       | `100`                        |
    /// | `CLOUDINARY_CLOUD_NAME`   | yes      | --                           |
    /// | `CLOUDINARY_API_KEY`      | yes      | --                           |
    /// | `CLOUDINARY_API_SECRET`   | yes      | --                           |
    /// | `CLOUDINARY_BASE_URL`     | no       | `https://api.cloudinary.com` |
    /// | `UPLOAD_TIMEOUT_SECS`     | no       | `30`                         |
    /// | `CORS_ALLOWED_ORIGINS`    | no       | localhost `3000,5173,8080`   |
    /// | `CORS_MAX_AGE_SECS`       | no       | `43200`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_mins = parsed(&lookup, "JWT_ACCESS_EXPIRY_MINS", DEFAULT_ACCESS_EXPIRY_MINS)?;
        let refresh_days = parsed(&lookup, "JWT_REFRESH_EXPIRY_DAYS", DEFAULT_REFRESH_EXPIRY_DAYS)?;

        Ok(Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: parsed(&lookup, "PORT", DEFAULT_PORT)?,
            },
            database: DatabaseConfig::from_lookup(&lookup)?,
            jwt: JwtConfig {
                secret: required(&lookup, "JWT_SECRET")?,
                access_ttl: positive_duration("JWT_ACCESS_EXPIRY_MINS", access_mins, Duration::try_minutes)?,
                refresh_ttl: positive_duration("JWT_REFRESH_EXPIRY_DAYS", refresh_days, Duration::try_days)?,
            },
            cloudinary: CloudinaryConfig {
                base_url: lookup("CLOUDINARY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_CLOUDINARY_BASE_URL.to_string()),
                cloud_name: required(&lookup, "CLOUDINARY_CLOUD_NAME")?,
                api_key: required(&lookup, "CLOUDINARY_API_KEY")?,
                api_secret: required(&lookup, "CLOUDINARY_API_SECRET")?,
                timeout_secs: parsed(&lookup, "UPLOAD_TIMEOUT_SECS", DEFAULT_UPLOAD_TIMEOUT_SECS)?,
            },
            cors: CorsConfig {
                allowed_origins: origins(&lookup, "CORS_ALLOWED_ORIGINS")?,
                max_age_secs: parsed(&lookup, "CORS_MAX_AGE_SECS", DEFAULT_CORS_MAX_AGE_SECS)?,
            },
        })
    }
}

impl DatabaseConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            url: required(lookup, "DATABASE_URL")?,
            max_connections: parsed(lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
        })
    }
}

/// Settings of the `seed` binary, which provisions the first admin account.
///
/// | Env Var            | Required | Default |
/// |--------------------|----------|---------|
/// | `DATABASE_URL`     | yes      | --      |
/// | `ADMIN_EMAIL`      | yes      | --      |
/// | `ADMIN_PASSWORD`   | yes      | --      |
/// | `ADMIN_FULL_NAME`  | no       | `Admin` |
/// | `ADMIN_PHONE`      | no       | --      |
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub database: DatabaseConfig,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_full_name: String,
    pub admin_phone: Option<String>,
}

impl SeedConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database: DatabaseConfig::from_lookup(&lookup)?,
            admin_email: required(&lookup, "ADMIN_EMAIL")?,
            admin_password: required(&lookup, "ADMIN_PASSWORD")?,
            admin_full_name: lookup("ADMIN_FULL_NAME").unwrap_or_else(|| "Admin".to_string()),
            admin_phone: lookup("ADMIN_PHONE").filter(|phone| !phone.trim().is_empty()),
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Comma-separated list of `http(s)://host[:port]` origins. A wildcard is refused
/// because credentials are allowed.
fn origins<F>(lookup: &F, name: &'static str) -> Result<Vec<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string());
    let list: Vec<String> = raw
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    let valid = |origin: &String| origin.starts_with("http://") || origin.starts_with("https://");
    if list.is_empty() || !list.iter().all(valid) {
        return Err(ConfigError::Invalid { name, value: raw });
    }
    Ok(list)
}

fn positive_duration(
    name: &'static str,
    amount: i64,
    build: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    match build(amount) {
        Some(duration) if amount > 0 => Ok(duration),
        _ => Err(ConfigError::Invalid {
            name,
            value: amount.to_string(),
        }),
    }
}
