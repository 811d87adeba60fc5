use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailTransport {
    Smtp,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub api_prefix: String,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    pub reset_token_ttl_minutes: i64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub from: String,
    pub reset_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Secret used when nothing is configured in development. Never accepted elsewhere.
const DEVELOPMENT_JWT_SECRET: &str = "clevermoney-development-secret";

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;
const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365;
const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 24 * 60;

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_PREFIX") {
            self.server.api_prefix = v;
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            self.database.backend = match v.to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "postgres" | "postgresql" => StorageBackend::Postgres,
                _ => self.database.backend,
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("RESET_TOKEN_TTL_MINUTES") {
            self.security.reset_token_ttl_minutes = v.parse().unwrap_or(self.security.reset_token_ttl_minutes);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Mail overrides
        if let Ok(v) = env::var("MAIL_TRANSPORT") {
            self.mail.transport = match v.to_ascii_lowercase().as_str() {
                "smtp" => MailTransport::Smtp,
                "log" => MailTransport::Log,
                _ => self.mail.transport,
            };
        }
        if let Ok(v) = env::var("EMAIL_HOST") {
            self.mail.host = v;
        }
        if let Ok(v) = env::var("EMAIL_PORT") {
            self.mail.port = v.parse().unwrap_or(self.mail.port);
        }
        if let Ok(v) = env::var("EMAIL_USER") {
            self.mail.user = v;
        }
        if let Ok(v) = env::var("EMAIL_PASSWORD") {
            self.mail.password = v;
        }
        if let Ok(v) = env::var("MAIL_FROM") {
            self.mail.from = v;
        }
        if let Ok(v) = env::var("PASSWORD_RESET_URL") {
            self.mail.reset_url = v;
        }

        if let Ok(v) = env::var("DEFAULT_PAGE_SIZE") {
            self.pagination.default_page_size = v.parse().unwrap_or(self.pagination.default_page_size);
        }
        if let Ok(v) = env::var("MAX_PAGE_SIZE") {
            self.pagination.max_page_size = v.parse().unwrap_or(self.pagination.max_page_size);
        }

        self
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Checks the settings the server cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.environment != Environment::Development && self.security.jwt_secret == DEVELOPMENT_JWT_SECRET {
            return Err(ConfigError::Invalid {
                field: "JWT_SECRET",
                reason: "the development secret cannot be used outside development".to_string(),
            });
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                field: "BCRYPT_COST",
                reason: format!("must be between {} and {}", MIN_BCRYPT_COST, MAX_BCRYPT_COST),
            });
        }
        if !(1..=MAX_JWT_EXPIRY_HOURS).contains(&self.security.jwt_expiry_hours) {
            return Err(ConfigError::Invalid {
                field: "JWT_EXPIRY_HOURS",
                reason: format!("must be between 1 and {}", MAX_JWT_EXPIRY_HOURS),
            });
        }
        if !(1..=MAX_RESET_TOKEN_TTL_MINUTES).contains(&self.security.reset_token_ttl_minutes) {
            return Err(ConfigError::Invalid {
                field: "RESET_TOKEN_TTL_MINUTES",
                reason: format!("must be between 1 and {}", MAX_RESET_TOKEN_TTL_MINUTES),
            });
        }
        if self.pagination.max_page_size < 1 {
            return Err(ConfigError::Invalid {
                field: "MAX_PAGE_SIZE",
                reason: "must be positive".to_string(),
            });
        }
        if !(1..=self.pagination.max_page_size).contains(&self.pagination.default_page_size) {
            return Err(ConfigError::Invalid {
                field: "DEFAULT_PAGE_SIZE",
                reason: format!("must be between 1 and {}", self.pagination.max_page_size),
            });
        }
        if self.database.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if url::Url::parse(&self.mail.reset_url).is_err() {
            return Err(ConfigError::Invalid {
                field: "PASSWORD_RESET_URL",
                reason: "must be an absolute URL".to_string(),
            });
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                api_prefix: "/api/v1".to_string(),
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                bcrypt_cost: 4,
                reset_token_ttl_minutes: 10,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            mail: MailConfig {
                transport: MailTransport::Log,
                host: "localhost".to_string(),
                port: 1025,
                user: String::new(),
                password: String::new(),
                from: "support@clevermoney.com".to_string(),
                reset_url: "http://localhost:3000/change-password/".to_string(),
            },
            pagination: PaginationConfig {
                default_page_size: 20,
                max_page_size: 100,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 5000,
                api_prefix: "/api/v1".to_string(),
                max_request_size_bytes: 512 * 1024,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                reset_token_ttl_minutes: 10,
                enable_cors: true,
                cors_origins: vec!["https://staging.clevermoney.com".to_string()],
            },
            mail: MailConfig {
                transport: MailTransport::Smtp,
                host: String::new(),
                port: 587,
                user: String::new(),
                password: String::new(),
                from: "support@clevermoney.com".to_string(),
                reset_url: "https://staging.clevermoney.com/change-password/".to_string(),
            },
            pagination: PaginationConfig {
                default_page_size: 20,
                max_page_size: 100,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 5000,
                api_prefix: "/api/v1".to_string(),
                max_request_size_bytes: 256 * 1024,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                reset_token_ttl_minutes: 10,
                enable_cors: true,
                cors_origins: vec!["https://app.clevermoney.com".to_string()],
            },
            mail: MailConfig {
                transport: MailTransport::Smtp,
                host: String::new(),
                port: 587,
                user: String::new(),
                password: String::new(),
                from: "support@clevermoney.com".to_string(),
                reset_url: "https://app.clevermoney.com/change-password/".to_string(),
            },
            pagination: PaginationConfig {
                default_page_size: 20,
                max_page_size: 100,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
