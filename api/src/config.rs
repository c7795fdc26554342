//! Service configuration
//!
//! Everything is read from environment variables (a `.env` file is loaded by
//! `main` first). `from_lookup` takes any key → value source so the parsing
//! rules can be tested without touching the process environment.

use std::env;
use std::fmt;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::ConnectOptions;
use thiserror::Error;
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-only-secret";
const DEFAULT_PORT: u16 = 3000;
const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const RATE_LIMIT_MAX_PRODUCTION: u32 = 100;
const RATE_LIMIT_MAX_DEVELOPMENT: u32 = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unsupported database dialect: {0}")]
    UnsupportedDialect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// `production` (any case) or development for anything else.
    pub fn parse(raw: Option<String>) -> Self {
        match raw.as_deref().map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Url(String),
    Parts {
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
    },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub target: DatabaseTarget,
    pub max_connections: u32,
    pub require_ssl: bool,
    pub log_statements: bool,
}

impl DatabaseConfig {
    /// `DATABASE_URL` wins in production; elsewhere the `DB_*` parts are used.
    fn from_lookup<F>(lookup: &F, environment: Environment) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dialect = lookup("DB_DIALECT").unwrap_or_else(|| "postgres".to_string());
        if !matches!(dialect.to_ascii_lowercase().as_str(), "postgres" | "postgresql") {
            return Err(ConfigError::UnsupportedDialect(dialect));
        }

        let target = match lookup("DATABASE_URL").filter(|_| environment.is_production()) {
            Some(url) => DatabaseTarget::Url(url),
            None => {
                if environment.is_production() {
                    warn!("DATABASE_URL not set in production, falling back to DB_* variables");
                }
                DatabaseTarget::Parts {
                    host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                    port: parse_or(lookup, "DB_PORT", 5432)?,
                    database: lookup("DB_NAME").unwrap_or_else(|| "boilerplate_db".to_string()),
                    username: lookup("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                    password: lookup("DB_PASSWORD").unwrap_or_else(|| "password".to_string()),
                }
            }
        };

        let max_connections = parse_or(lookup, "DB_MAX_CONNECTIONS", 10u32)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidConfig(
                "DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            target,
            max_connections,
            require_ssl: environment.is_production(),
            log_statements: !environment.is_production() && parse_flag(lookup("DEV_MODE")),
        })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let options = match &self.target {
            DatabaseTarget::Url(url) => url.parse::<PgConnectOptions>().map_err(|e| {
                ConfigError::InvalidConfig(format!("Invalid DATABASE_URL: {}", e))
            })?,
            DatabaseTarget::Parts {
                host,
                port,
                database,
                username,
                password,
            } => PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(database)
                .username(username)
                .password(password),
        };

        let options = if self.require_ssl {
            options.ssl_mode(PgSslMode::Require)
        } else {
            options
        };

        Ok(if self.log_statements {
            options
        } else {
            options.disable_statement_logging()
        })
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window: Duration,
    /// Key clients on `x-forwarded-for` / `x-real-ip` instead of the peer address.
    pub trust_proxy: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub jwt_secret: String,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::parse(lookup("APP_ENV"));

        let port = match lookup("PORT").or_else(|| lookup("APP_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidConfig(format!("Invalid port `{}`: {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let jwt_secret = match lookup("JWT_SECRET_KEY").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None if environment.is_production() => {
                return Err(ConfigError::MissingEnv("JWT_SECRET_KEY".to_string()))
            }
            None => {
                warn!("JWT_SECRET_KEY not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let database = DatabaseConfig::from_lookup(&lookup, environment)?;

        let default_max = if environment.is_production() {
            RATE_LIMIT_MAX_PRODUCTION
        } else {
            RATE_LIMIT_MAX_DEVELOPMENT
        };
        let max_requests = parse_or(&lookup, "RATE_LIMIT_MAX", default_max)?;
        let window_secs = parse_or(&lookup, "RATE_LIMIT_WINDOW_SECONDS", RATE_LIMIT_WINDOW_SECS)?;
        if max_requests == 0 || window_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "RATE_LIMIT_MAX and RATE_LIMIT_WINDOW_SECONDS must be positive".to_string(),
            ));
        }

        info!(
            environment = %environment,
            port,
            rate_limit_max = max_requests,
            rate_limit_window_secs = window_secs,
            "Configuration loaded"
        );

        Ok(Self {
            environment,
            port,
            jwt_secret,
            database,
            rate_limit: RateLimitSettings {
                max_requests,
                window: Duration::from_secs(window_secs),
                trust_proxy: parse_flag(lookup("TRUST_PROXY")),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid {}: `{}` ({})", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_flag(raw: Option<String>) -> bool {
    raw.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}
