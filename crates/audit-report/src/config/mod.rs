use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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
    pub reports: ReportConfig,
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

        let data_dir = PathBuf::from(env::var("AUDIT_DATA_DIR").unwrap_or_else(|_| "data".into()));
        let output_dir =
            PathBuf::from(env::var("AUDIT_REPORT_DIR").unwrap_or_else(|_| "reports".into()));

        let threshold_ttl_secs = parse_numeric::<u64>(
            "AUDIT_THRESHOLD_TTL_SECS",
            DEFAULT_THRESHOLD_TTL_SECS,
        )?;
        let attachment_workers =
            parse_numeric::<usize>("AUDIT_ATTACHMENT_WORKERS", DEFAULT_ATTACHMENT_WORKERS)?;
        if attachment_workers == 0 {
            return Err(ConfigError::InvalidNumber {
                variable: "AUDIT_ATTACHMENT_WORKERS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            reports: ReportConfig {
                data_dir,
                output_dir,
                threshold_ttl: Duration::from_secs(threshold_ttl_secs),
                attachment_workers,
            },
        })
    }
}

const DEFAULT_THRESHOLD_TTL_SECS: u64 = 300;
const DEFAULT_ATTACHMENT_WORKERS: usize = 4;

fn parse_numeric<T: std::str::FromStr>(
    variable: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber {
                variable,
                value: raw,
            }),
        Err(_) => Ok(default),
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

/// Where audit data is read from and rendered reports are written to.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub threshold_ttl: Duration,
    pub attachment_workers: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("reports"),
            threshold_ttl: Duration::from_secs(DEFAULT_THRESHOLD_TTL_SECS),
            attachment_workers: DEFAULT_ATTACHMENT_WORKERS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a positive integer (got '{value}')")
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
