use crate::auth::JwtConfig;
use chrono_tz::Tz;
use std::str::FromStr;

/// Read an environment variable, falling back to `default` when unset or unparsable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/dispatch | Database and log directory |
/// | HTTP_PORT | 3000 | HTTP listen port |
/// | ENVIRONMENT | development | development / staging / production |
/// | LOG_LEVEL | info | Default tracing level |
/// | LOG_JSON | false | JSON log lines |
/// | TIMEZONE | UTC | IANA zone used for arrival window labels |
/// | MAX_CONNECTIONS | 1000 | Concurrent request limit |
/// | REQUEST_TIMEOUT_MS | 30000 | Per-request timeout |
///
/// Tracking, ETA, geolocation and dispatch settings are documented on their
/// own structs.
///
/// ```ignore
/// WORK_DIR=/data/dispatch HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    pub jwt: JwtConfig,
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub timezone: Tz,
    pub max_connections: u32,
    pub request_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
    pub tracking: TrackingConfig,
    pub eta: EtaConfig,
    pub geo: GeoConfig,
    pub dispatch: DispatchConfig,
}

/// Poll cadence advertised in tracking snapshots
///
/// `ACTIVE_POLL_INTERVAL_MS` (30000) while in transit,
/// `IDLE_POLL_INTERVAL_MS` (300000) otherwise.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub active_poll_interval_ms: u64,
    pub idle_poll_interval_ms: u64,
}

/// ETA estimator tuning
///
/// | Variable | Default |
/// |----------|---------|
/// | ETA_REFRESH_INTERVAL_MS | 20000 |
/// | ETA_MIN_DISPLACEMENT_M | 150 |
/// | ROUTING_URL | unset (routing disabled) |
/// | ROUTING_TIMEOUT_MS | 3000 |
/// | ETA_MAX_ATTEMPTS | 3 |
/// | ETA_RETRY_BACKOFF_MS | 5000 |
/// | MANUAL_ETA_GRACE_MS | 60000 |
#[derive(Debug, Clone)]
pub struct EtaConfig {
    pub refresh_interval_ms: u64,
    pub min_displacement_m: f64,
    pub routing_url: Option<String>,
    pub routing_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub manual_grace_ms: u64,
}

/// Geolocation / geocoding
///
/// | Variable | Default |
/// |----------|---------|
/// | GEOLOCATION_TIMEOUT_MS | 10000 |
/// | GEOCODER_URL | unset (reverse geocoding disabled) |
/// | GEOCODER_API_KEY | unset |
/// | GEOCODER_TIMEOUT_MS | 5000 |
#[derive(Debug, Clone)]
pub struct GeoConfig {
    pub acquisition_timeout_ms: u64,
    pub geocoder_url: Option<String>,
    pub geocoder_api_key: Option<String>,
    pub geocoder_timeout_ms: u64,
}

/// Offer handling
///
/// | Variable | Default |
/// |----------|---------|
/// | OFFER_TTL_MS | 900000 |
/// | OFFER_SWEEP_INTERVAL_MS | 30000 |
/// | DEFAULT_CHECKLIST | Inspect device,Diagnose fault,Repair,Test operation,Clean up site |
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub offer_ttl_ms: u64,
    pub offer_sweep_interval_ms: u64,
    pub default_checklist: Vec<String>,
}

const DEFAULT_CHECKLIST: &str = "Inspect device,Diagnose fault,Repair,Test operation,Clean up site";

fn parse_checklist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(String::from)
        .collect()
}

impl TrackingConfig {
    pub fn from_env() -> Self {
        Self {
            active_poll_interval_ms: env_or("ACTIVE_POLL_INTERVAL_MS", 30_000),
            idle_poll_interval_ms: env_or("IDLE_POLL_INTERVAL_MS", 300_000),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            active_poll_interval_ms: 30_000,
            idle_poll_interval_ms: 300_000,
        }
    }
}

impl EtaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            refresh_interval_ms: env_or("ETA_REFRESH_INTERVAL_MS", defaults.refresh_interval_ms),
            min_displacement_m: env_or("ETA_MIN_DISPLACEMENT_M", defaults.min_displacement_m),
            routing_url: env_opt("ROUTING_URL"),
            routing_timeout_ms: env_or("ROUTING_TIMEOUT_MS", defaults.routing_timeout_ms),
            max_attempts: env_or("ETA_MAX_ATTEMPTS", defaults.max_attempts),
            retry_backoff_ms: env_or("ETA_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
            manual_grace_ms: env_or("MANUAL_ETA_GRACE_MS", defaults.manual_grace_ms),
        }
    }
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 20_000,
            min_displacement_m: 150.0,
            routing_url: None,
            routing_timeout_ms: 3_000,
            max_attempts: 3,
            retry_backoff_ms: 5_000,
            manual_grace_ms: 60_000,
        }
    }
}

impl GeoConfig {
    pub fn from_env() -> Self {
        Self {
            acquisition_timeout_ms: env_or("GEOLOCATION_TIMEOUT_MS", 10_000),
            geocoder_url: env_opt("GEOCODER_URL"),
            geocoder_api_key: env_opt("GEOCODER_API_KEY"),
            geocoder_timeout_ms: env_or("GEOCODER_TIMEOUT_MS", 5_000),
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            acquisition_timeout_ms: 10_000,
            geocoder_url: None,
            geocoder_api_key: None,
            geocoder_timeout_ms: 5_000,
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Self {
        Self {
            offer_ttl_ms: env_or("OFFER_TTL_MS", 900_000),
            offer_sweep_interval_ms: env_or("OFFER_SWEEP_INTERVAL_MS", 30_000),
            default_checklist: parse_checklist(
                &std::env::var("DEFAULT_CHECKLIST").unwrap_or_else(|_| DEFAULT_CHECKLIST.into()),
            ),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            offer_ttl_ms: 900_000,
            offer_sweep_interval_ms: 30_000,
            default_checklist: parse_checklist(DEFAULT_CHECKLIST),
        }
    }
}

impl Config {
    /// Load configuration from the environment (after `.env`, if present)
    ///
    /// Unset variables take their defaults.
    pub fn from_env() -> Self {
        let timezone = std::env::var("TIMEZONE")
            .ok()
            .and_then(|name| match name.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(e) => {
                    tracing::warn!(timezone = %name, error = %e, "Invalid TIMEZONE, using UTC");
                    None
                }
            })
            .unwrap_or(chrono_tz::UTC);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/dispatch".into()),
            http_port: env_or("HTTP_PORT", 3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            timezone,
            max_connections: env_or("MAX_CONNECTIONS", 1000),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30_000),
            shutdown_timeout_ms: env_or("SHUTDOWN_TIMEOUT_MS", 10_000),
            tracking: TrackingConfig::from_env(),
            eta: EtaConfig::from_env(),
            geo: GeoConfig::from_env(),
            dispatch: DispatchConfig::from_env(),
        }
    }

    /// Override the work directory and port (tests)
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir)
            .join("database")
            .join("dispatch.redb")
    }

    pub fn log_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
