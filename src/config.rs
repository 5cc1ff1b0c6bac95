use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "library-lending-dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },

    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where books, loans, and users are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local tables, lost on exit. For development and tests.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

/// Staff account to create at startup.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

/// Runtime configuration, read from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub reconcile_interval: Option<Duration>,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let storage = parse_or(&var, "STORAGE_BACKEND", StorageBackend::Postgres)?;

        let database_url = var("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing {
                name: "DATABASE_URL",
            });
        }

        let jwt_secret = match (var("JWT_SECRET"), storage) {
            (Some(secret), _) => secret,
            (None, StorageBackend::Memory) => DEV_JWT_SECRET.to_string(),
            (None, StorageBackend::Postgres) => {
                return Err(ConfigError::Missing { name: "JWT_SECRET" });
            }
        };

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    name: "ADMIN_PASSWORD",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing {
                    name: "ADMIN_EMAIL",
                });
            }
        };

        let reconcile_interval = match var("RECONCILE_INTERVAL_SECS") {
            Some(raw) => Some(Duration::from_secs(parse("RECONCILE_INTERVAL_SECS", &raw)?)),
            None => None,
        };

        Ok(Self {
            storage,
            database_url,
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 5)?,
            port: parse_or(&var, "PORT", 3000)?,
            jwt_secret,
            access_token_ttl: Duration::from_secs(parse_or(&var, "ACCESS_TOKEN_TTL_SECS", 300)?),
            refresh_token_ttl: Duration::from_secs(parse_or(
                &var,
                "REFRESH_TOKEN_TTL_SECS",
                86_400,
            )?),
            reconcile_interval: reconcile_interval.filter(|d| !d.is_zero()),
            admin,
        })
    }
}

fn parse<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(raw) => parse(name, &raw),
        None => Ok(default),
    }
}
