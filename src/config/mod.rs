use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::screening::ScreeningConfig;

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
    pub screening: ScreeningConfig,
    pub sweep: SweepConfig,
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

        let mut screening = ScreeningConfig::default();
        if let Some(days) = env_parse::<i64>("SCREENING_SESSION_TTL_DAYS")? {
            screening.session_ttl_days = positive_days(days, "SCREENING_SESSION_TTL_DAYS")?;
        }
        if let Some(days) = env_parse::<i64>("SCREENING_REMINDER_DELAY_DAYS")? {
            screening.reminder.delay_days = positive_days(days, "SCREENING_REMINDER_DELAY_DAYS")?;
        }
        if let Some(threshold) = env_parse::<f32>("SCREENING_REMINDER_RISK_THRESHOLD")? {
            screening.reminder.risk_threshold = threshold;
        }
        if let Some(attempts) = env_parse::<u32>("SCREENING_MAX_DELIVERY_ATTEMPTS")? {
            screening.reminder.max_delivery_attempts = attempts;
        }
        if let Some(alert) = env_parse::<f32>("SCREENING_RISK_ALERT")? {
            screening.risk.thresholds.risk_alert = alert;
        }
        if let Some(caution) = env_parse::<f32>("SCREENING_RISK_CAUTION")? {
            screening.risk.thresholds.risk_caution = caution;
        }
        if let Some(entries) = env_parse::<usize>("SCREENING_COMPACTION_MAX_ENTRIES")? {
            screening.compaction.max_entries = entries;
        }
        if let Some(bytes) = env_parse::<usize>("SCREENING_COMPACTION_MAX_BYTES")? {
            screening.compaction.max_bytes = bytes;
        }
        if let Some(chars) = env_parse::<usize>("SCREENING_SUMMARY_MAX_CHARS")? {
            screening.compaction.summary_max_chars = chars;
        }

        let mut sweep = SweepConfig::default();
        if let Some(secs) = env_parse::<u64>("SCREENING_REMINDER_SWEEP_SECS")? {
            sweep.reminder_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("SCREENING_COMPACTION_SWEEP_SECS")? {
            sweep.compaction_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("SCREENING_RESCORE_SWEEP_SECS")? {
            sweep.rescore_secs = secs;
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            screening,
            sweep,
        })
    }
}

// Day counts feed `expires_at = created_at + ttl` and the follow-up date;
// zero or negative values would place deadlines in the past.
fn positive_days(value: i64, key: &'static str) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::OutOfRange { key });
    }
    Ok(value)
}

fn env_parse<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(None),
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

/// Background sweep cadence for the serve loop.
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    pub reminder_secs: u64,
    pub compaction_secs: u64,
    pub rescore_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            reminder_secs: 60,
            compaction_secs: 300,
            rescore_secs: 120,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    OutOfRange { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must parse to a number")
            }
            ConfigError::OutOfRange { key } => {
                write!(f, "{key} must be a positive number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::OutOfRange { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SCREENING_SESSION_TTL_DAYS",
            "SCREENING_REMINDER_DELAY_DAYS",
            "SCREENING_REMINDER_RISK_THRESHOLD",
            "SCREENING_MAX_DELIVERY_ATTEMPTS",
            "SCREENING_RISK_ALERT",
            "SCREENING_RISK_CAUTION",
            "SCREENING_COMPACTION_MAX_ENTRIES",
            "SCREENING_COMPACTION_MAX_BYTES",
            "SCREENING_SUMMARY_MAX_CHARS",
            "SCREENING_REMINDER_SWEEP_SECS",
            "SCREENING_COMPACTION_SWEEP_SECS",
            "SCREENING_RESCORE_SWEEP_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.screening.session_ttl_days, 7);
        assert_eq!(config.screening.reminder.delay_days, 3);
        assert_eq!(config.sweep.reminder_secs, 60);
    }

    #[test]
    fn screening_overrides_are_applied() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCREENING_SESSION_TTL_DAYS", "14");
        env::set_var("SCREENING_REMINDER_DELAY_DAYS", "1");
        env::set_var("SCREENING_COMPACTION_MAX_ENTRIES", "10");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.screening.session_ttl_days, 14);
        assert_eq!(config.screening.reminder.delay_days, 1);
        assert_eq!(config.screening.compaction.max_entries, 10);
        reset_env();
    }

    #[test]
    fn rejects_unparseable_override() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCREENING_SESSION_TTL_DAYS", "not-a-number");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { key }) => {
                assert_eq!(key, "SCREENING_SESSION_TTL_DAYS");
            }
            other => panic!("expected invalid number error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_non_positive_day_counts() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCREENING_SESSION_TTL_DAYS", "-1");
        match AppConfig::load() {
            Err(ConfigError::OutOfRange { key }) => {
                assert_eq!(key, "SCREENING_SESSION_TTL_DAYS");
            }
            other => panic!("expected out of range error, got {other:?}"),
        }

        reset_env();
        env::set_var("SCREENING_REMINDER_DELAY_DAYS", "0");
        match AppConfig::load() {
            Err(ConfigError::OutOfRange { key }) => {
                assert_eq!(key, "SCREENING_REMINDER_DELAY_DAYS");
            }
            other => panic!("expected out of range error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}
