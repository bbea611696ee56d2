use std::env;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::ranking::policy::{IneligibleHandling, PolicyError, RankingPolicy};

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

/// Top-level configuration for the ranking job and its admin surface.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub ranking: RankingConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            ranking: RankingConfig::load()?,
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

/// Ranking policy and the data directory the job reads from.
#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub policy: RankingPolicy,
    pub data_dir: PathBuf,
}

impl RankingConfig {
    /// Policy comes from `MPI_POLICY_PATH` when set, otherwise defaults; `MPI_WINDOW_DAYS` and
    /// `MPI_INELIGIBLE_HANDLING` override the loaded values.
    fn load() -> Result<Self, ConfigError> {
        let mut policy = match env::var("MPI_POLICY_PATH") {
            Ok(path) if !path.trim().is_empty() => load_policy_file(PathBuf::from(path))?,
            _ => RankingPolicy::default(),
        };

        if let Ok(raw) = env::var("MPI_WINDOW_DAYS") {
            policy.window_days = raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidWindowDays(raw.clone()))?;
        }

        if let Ok(raw) = env::var("MPI_INELIGIBLE_HANDLING") {
            policy.ineligible_handling = IneligibleHandling::parse(&raw)
                .ok_or_else(|| ConfigError::InvalidIneligibleHandling(raw.clone()))?;
        }

        policy.validate().map_err(ConfigError::InvalidPolicy)?;

        let data_dir = env::var("MPI_DATA_DIR").unwrap_or_else(|_| "data".to_string());

        Ok(Self {
            policy,
            data_dir: PathBuf::from(data_dir),
        })
    }
}

fn load_policy_file(path: PathBuf) -> Result<RankingPolicy, ConfigError> {
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::PolicyFile {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::PolicyParse { path, source })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("MPI_WINDOW_DAYS must be a positive integer (found '{0}')")]
    InvalidWindowDays(String),
    #[error("MPI_INELIGIBLE_HANDLING must be one of exclude, unranked, rank (found '{0}')")]
    InvalidIneligibleHandling(String),
    #[error("unable to read policy file {}", .path.display())]
    PolicyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("policy file {} is not valid policy JSON", .path.display())]
    PolicyParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid ranking policy: {0}")]
    InvalidPolicy(#[source] PolicyError),
}
