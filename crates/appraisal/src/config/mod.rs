use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::valuation::{AggregationMethod, ParkingRates, SessionDefaults, DEFAULT_DISCOUNT};

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
    pub valuation: ValuationConfig,
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
            valuation: ValuationConfig::from_env()?,
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

/// Defaults for new appraisal sessions and the parking flat rates.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationConfig {
    pub default_discount: f64,
    pub default_method: AggregationMethod,
    pub parking_rates: ParkingRates,
}

impl ValuationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let parking_defaults = ParkingRates::default();

        let default_discount = number_var("APP_DEFAULT_DISCOUNT", DEFAULT_DISCOUNT)?;
        if !(0.0..=100.0).contains(&default_discount) {
            return Err(ConfigError::InvalidNumber {
                variable: "APP_DEFAULT_DISCOUNT",
                value: default_discount.to_string(),
            });
        }

        let default_method = match env::var("APP_DEFAULT_METHOD") {
            Ok(raw) => raw
                .parse::<AggregationMethod>()
                .map_err(|_| ConfigError::InvalidMethod { value: raw })?,
            Err(_) => AggregationMethod::default(),
        };

        let parking_rates = ParkingRates {
            private: non_negative_var("APP_PARKING_PRIVATE", parking_defaults.private)?,
            shared: non_negative_var("APP_PARKING_SHARED", parking_defaults.shared)?,
        };

        Ok(Self {
            default_discount,
            default_method,
            parking_rates,
        })
    }

    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            discount: self.default_discount,
            method: self.default_method,
        }
    }
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            default_discount: DEFAULT_DISCOUNT,
            default_method: AggregationMethod::default(),
            parking_rates: ParkingRates::default(),
        }
    }
}

fn number_var(variable: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ConfigError::InvalidNumber {
                variable,
                value: raw,
            }),
        },
        Err(_) => Ok(default),
    }
}

fn non_negative_var(variable: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = number_var(variable, default)?;
    if value < 0.0 {
        return Err(ConfigError::InvalidNumber {
            variable,
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str, value: String },
    InvalidMethod { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a valid number in range, got '{value}'")
            }
            ConfigError::InvalidMethod { value } => write!(
                f,
                "APP_DEFAULT_METHOD must be one of mean, weighted-mean, median; got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidMethod { .. } => None,
        }
    }
}
