//! sked Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Document store connection
    pub database: DatabaseConfig,

    /// Token issuance and password hashing
    pub auth: AuthConfig,

    /// Activation mail links
    pub mail: MailConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_env("API_PORT")? {
            config.server.port = port;
        }
        if let Some(secs) = parse_env("REQUEST_TIMEOUT_SECS")? {
            config.server.request_timeout_secs = secs;
        }

        // CORS origins from environment variable (comma-separated)
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // SurrealDB
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            config.database.surrealdb_url = url;
        }
        if let Ok(user) = std::env::var("SURREALDB_USER") {
            config.database.surrealdb_user = user;
        }
        if let Ok(pass) = std::env::var("SURREALDB_PASS") {
            config.database.surrealdb_pass = pass;
        }
        if let Ok(ns) = std::env::var("SURREALDB_NAMESPACE") {
            config.database.surrealdb_namespace = ns;
        }
        if let Ok(db) = std::env::var("SURREALDB_DATABASE") {
            config.database.surrealdb_database = db;
        }
        if let Some(ms) = parse_env("STORE_TIMEOUT_MS")? {
            config.database.timeout_ms = ms;
        }

        // Tokens
        if let Ok(secret) = std::env::var("JWT_ACCESS_SECRET") {
            config.auth.access_secret = secret;
        }
        if let Ok(secret) = std::env::var("JWT_REFRESH_SECRET") {
            config.auth.refresh_secret = secret;
        }
        if let Some(secs) = parse_env("JWT_ACCESS_TTL_SECS")? {
            config.auth.access_ttl_secs = secs;
        }
        if let Some(secs) = parse_env("JWT_REFRESH_TTL_SECS")? {
            config.auth.refresh_ttl_secs = secs;
        }
        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            config.auth.issuer = issuer;
        }
        if let Some(secure) = parse_env("COOKIE_SECURE")? {
            config.auth.cookie_secure = secure;
        }

        // Password hashing work factor
        if let Some(m) = parse_env("PASSWORD_MEMORY_COST")? {
            config.auth.password.memory_cost = m;
        }
        if let Some(t) = parse_env("PASSWORD_TIME_COST")? {
            config.auth.password.time_cost = t;
        }
        if let Some(p) = parse_env("PASSWORD_PARALLELISM")? {
            config.auth.password.parallelism = p;
        }

        // Mail links
        if let Ok(url) = std::env::var("API_URL") {
            config.mail.public_api_url = url;
        }
        if let Ok(url) = std::env::var("CLIENT_URL") {
            config.mail.client_url = url;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = parse_env("LOG_JSON")? {
            config.logging.json_format = json;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        // Only override if env values differ from defaults
        if env_config.server.host != ServerConfig::default().host {
            self.server.host = env_config.server.host;
        }
        if env_config.server.port != ServerConfig::default().port {
            self.server.port = env_config.server.port;
        }
        if !env_config.server.cors_origins.is_empty() {
            self.server.cors_origins = env_config.server.cors_origins;
        }
        if env_config.database.surrealdb_url != DatabaseConfig::default().surrealdb_url {
            self.database.surrealdb_url = env_config.database.surrealdb_url;
        }
        if env_config.mail.public_api_url != MailConfig::default().public_api_url {
            self.mail.public_api_url = env_config.mail.public_api_url;
        }
        if env_config.mail.client_url != MailConfig::default().client_url {
            self.mail.client_url = env_config.mail.client_url;
        }

        // Always use env for sensitive values
        if std::env::var("SURREALDB_PASS").is_ok() {
            self.database.surrealdb_pass = env_config.database.surrealdb_pass;
        }
        if std::env::var("JWT_ACCESS_SECRET").is_ok() {
            self.auth.access_secret = env_config.auth.access_secret;
        }
        if std::env::var("JWT_REFRESH_SECRET").is_ok() {
            self.auth.refresh_secret = env_config.auth.refresh_secret;
        }

        Ok(self)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.access_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.access_secret".to_string()));
        }
        if self.auth.refresh_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.refresh_secret".to_string()));
        }
        if self.auth.access_secret == self.auth.refresh_secret {
            return Err(ConfigError::InvalidValue {
                key: "auth.refresh_secret".to_string(),
                value: "must differ from auth.access_secret".to_string(),
            });
        }
        if self.auth.access_ttl_secs == 0 || self.auth.access_ttl_secs >= self.auth.refresh_ttl_secs
        {
            return Err(ConfigError::InvalidValue {
                key: "auth.access_ttl_secs".to_string(),
                value: self.auth.access_ttl_secs.to_string(),
            });
        }
        if self.database.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "database.timeout_ms".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            request_timeout_secs: 30,
            // Empty by default for security - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Document store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SurrealDB WebSocket URL
    pub surrealdb_url: String,

    /// SurrealDB username
    pub surrealdb_user: String,

    /// SurrealDB password
    pub surrealdb_pass: String,

    /// SurrealDB namespace
    pub surrealdb_namespace: String,

    /// SurrealDB database name
    pub surrealdb_database: String,

    /// Upper bound for a single store call in milliseconds
    pub timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            surrealdb_url: "ws://localhost:8000".to_string(),
            surrealdb_user: "root".to_string(),
            surrealdb_pass: "root".to_string(),
            surrealdb_namespace: "sked".to_string(),
            surrealdb_database: "accounts".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Token issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    pub access_secret: String,

    /// HMAC secret for refresh tokens (must differ from the access secret)
    pub refresh_secret: String,

    /// Access token lifetime in seconds (default: 1800 = 30 minutes)
    pub access_ttl_secs: u64,

    /// Refresh token and cookie lifetime in seconds (default: 30 days)
    pub refresh_ttl_secs: u64,

    /// Token issuer identifier
    pub issuer: String,

    /// Add the `Secure` attribute to the refresh token cookie
    pub cookie_secure: bool,

    /// Password hashing work factor
    pub password: PasswordConfig,
}

const DEV_ACCESS_SECRET: &str = "development-access-secret-change-in-production";
const DEV_REFRESH_SECRET: &str = "development-refresh-secret-change-in-production";

impl AuthConfig {
    /// Whether either HMAC secret is still the public development default
    pub fn uses_development_secrets(&self) -> bool {
        self.access_secret == DEV_ACCESS_SECRET || self.refresh_secret == DEV_REFRESH_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: DEV_ACCESS_SECRET.to_string(),
            refresh_secret: DEV_REFRESH_SECRET.to_string(),
            access_ttl_secs: 30 * 60,
            refresh_ttl_secs: 30 * 24 * 60 * 60,
            issuer: "sked-api".to_string(),
            cookie_secure: false,
            password: PasswordConfig::default(),
        }
    }
}

/// Argon2id work factor
///
/// Increasing memory or iterations improves security but slows down hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (lanes, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

/// Activation mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Public base URL of this API, used to build activation links
    pub public_api_url: String,

    /// Client URL the activation endpoint redirects to
    pub client_url: String,
}

impl MailConfig {
    /// Full activation URL for a minted link
    pub fn activation_url(&self, link: &str) -> String {
        format!(
            "{}/api/activate/{link}",
            self.public_api_url.trim_end_matches('/')
        )
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            public_api_url: "http://localhost:5000".to_string(),
            client_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
