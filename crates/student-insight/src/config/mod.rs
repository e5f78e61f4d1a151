use std::env;
use std::fmt;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::prediction::ModelVersion;

/// Bounds applied to the remote scorer timeout, in seconds.
pub const REMOTE_TIMEOUT_RANGE: (u64, u64) = (10, 15);
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 12;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Trimmed value of `key`; unset and blank read the same.
fn setting(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Deployment stage the service runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the binary needs at startup, read from `.env` and the process environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: setting("APP_ENV")
                .map(|value| AppEnvironment::parse(&value))
                .unwrap_or(AppEnvironment::Development),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig {
                log_level: setting("APP_LOG_LEVEL")
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            },
            scoring: ScoringConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = match setting("APP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: setting("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    /// Bind address; `localhost` maps to the IPv4 loopback.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost {
                    host: self.host.clone(),
                    source,
                })?
        };

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Remote scorer location and the default scoring variant.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub remote_url: Option<String>,
    pub remote_timeout: Duration,
    pub model_version: ModelVersion,
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let remote_timeout = match setting("REMOTE_SCORER_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Self::bounded_timeout)
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        };

        let model_version = match setting("MODEL_VERSION") {
            Some(raw) => raw
                .parse::<ModelVersion>()
                .map_err(|_| ConfigError::UnknownModelVersion(raw))?,
            None => ModelVersion::LATEST,
        };

        Ok(Self {
            remote_url: setting("REMOTE_SCORER_URL"),
            remote_timeout,
            model_version,
        })
    }

    /// Clamp a timeout in seconds into the supported remote window.
    pub fn bounded_timeout(secs: u64) -> Duration {
        let (min, max) = REMOTE_TIMEOUT_RANGE;
        Duration::from_secs(secs.clamp(min, max))
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            model_version: ModelVersion::LATEST,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort(String),
    InvalidHost {
        host: String,
        source: AddrParseError,
    },
    InvalidTimeout(String),
    UnknownModelVersion(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort(raw) => write!(f, "APP_PORT '{raw}' is not a valid port"),
            ConfigError::InvalidHost { host, .. } => {
                write!(f, "APP_HOST '{host}' is not an IP address or localhost")
            }
            ConfigError::InvalidTimeout(raw) => write!(
                f,
                "REMOTE_SCORER_TIMEOUT_SECS '{raw}' must be a whole number of seconds"
            ),
            ConfigError::UnknownModelVersion(raw) => {
                write!(f, "MODEL_VERSION '{raw}' does not name a known scoring variant")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source, .. } => Some(source),
            _ => None,
        }
    }
}
