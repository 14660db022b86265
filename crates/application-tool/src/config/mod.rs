use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_DRAFT_RETRY_ATTEMPTS: u32 = 5;
const DEFAULT_DRAFT_RETRY_BACKOFF_MS: u64 = 10;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub versioning: VersioningConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let draft_retry_attempts = match env::var("UAT_DRAFT_RETRY_ATTEMPTS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts > 0)
                .ok_or(ConfigError::InvalidRetryAttempts { value: raw })?,
            Err(_) => DEFAULT_DRAFT_RETRY_ATTEMPTS,
        };
        let draft_retry_backoff_ms = match env::var("UAT_DRAFT_RETRY_BACKOFF_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidRetryBackoff { value: raw })?,
            Err(_) => DEFAULT_DRAFT_RETRY_BACKOFF_MS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            versioning: VersioningConfig {
                draft_retry_attempts,
                draft_retry_backoff: Duration::from_millis(draft_retry_backoff_ms),
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Bounds for the serializable draft-creation retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersioningConfig {
    pub draft_retry_attempts: u32,
    pub draft_retry_backoff: Duration,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            draft_retry_attempts: DEFAULT_DRAFT_RETRY_ATTEMPTS,
            draft_retry_backoff: Duration::from_millis(DEFAULT_DRAFT_RETRY_BACKOFF_MS),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRetryAttempts { value: String },
    InvalidRetryBackoff { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRetryAttempts { value } => write!(
                f,
                "UAT_DRAFT_RETRY_ATTEMPTS must be a positive integer (found '{value}')"
            ),
            ConfigError::InvalidRetryBackoff { value } => write!(
                f,
                "UAT_DRAFT_RETRY_BACKOFF_MS must be a whole number of milliseconds (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidRetryAttempts { .. }
            | ConfigError::InvalidRetryBackoff { .. } => None,
        }
    }
}
