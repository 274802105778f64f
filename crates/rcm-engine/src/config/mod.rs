use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::adjudication::CallThrottle;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

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
    pub advisory: AdvisoryConfig,
    pub validation: ValidationConfig,
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

        let max_concurrency: usize = parse_var("VALIDATION_CONCURRENCY", 8)?;
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "VALIDATION_CONCURRENCY",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            advisory: AdvisoryConfig::from_env()?,
            validation: ValidationConfig { max_concurrency },
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// External model access for the advisory ladder.
#[derive(Clone)]
pub struct AdvisoryConfig {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub min_interval: Duration,
    pub request_timeout: Duration,
    pub rate_limit_backoff: Duration,
}

impl AdvisoryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = match env::var("LLM_PROVIDER") {
            Ok(value) => {
                let value = value.trim().to_ascii_lowercase();
                match value.as_str() {
                    "" | "none" | "off" | "disabled" => None,
                    _ => Some(value),
                }
            }
            Err(_) => Some("gemini".to_string()),
        };

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            provider,
            api_key,
            model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            endpoint: env::var("LLM_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            temperature: parse_var("LLM_TEMPERATURE", 0.0)?,
            min_interval: Duration::from_millis(parse_var("LLM_MIN_INTERVAL_MS", 1_000)?),
            request_timeout: Duration::from_millis(parse_var("LLM_TIMEOUT_MS", 10_000)?),
            rate_limit_backoff: Duration::from_secs(parse_var("LLM_BACKOFF_SECS", 60)?),
        })
    }

    /// Advisory ladder with no model tier.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.0,
            min_interval: Duration::from_millis(1_000),
            request_timeout: Duration::from_millis(10_000),
            rate_limit_backoff: Duration::from_secs(60),
        }
    }

    /// API key to use for the model tier, if the provider is supported and a
    /// key is present.
    pub fn credential(&self) -> Option<&str> {
        match self.provider.as_deref() {
            Some("gemini") | Some("google") => self.api_key.as_deref(),
            _ => None,
        }
    }

    /// Fresh throttle sized from this configuration. Share the returned handle
    /// between every caller of the same remote account.
    pub fn throttle(&self) -> Arc<CallThrottle> {
        Arc::new(CallThrottle::new(self.min_interval, self.rate_limit_backoff))
    }
}

impl fmt::Debug for AdvisoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisoryConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("min_interval", &self.min_interval)
            .field("request_timeout", &self.request_timeout)
            .field("rate_limit_backoff", &self.rate_limit_backoff)
            .finish()
    }
}

/// Batch validation controls.
#[derive(Debug, Clone, Copy)]
pub struct ValidationConfig {
    pub max_concurrency: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        _ => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a valid positive number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
