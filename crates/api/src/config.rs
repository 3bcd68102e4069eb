//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Host resolved to decide whether the network is up before reconnecting.
    pub realtime_probe_host: String,
    /// Delay before retrying an offline reconnect.
    pub realtime_retry: Duration,
    /// How often the watchdog checks the realtime transport.
    pub realtime_watchdog: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `API_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:agency.db?mode=rwc` |
    /// | `REALTIME_PROBE_HOST` | Reachability probe host | `supabase.co` |
    /// | `REALTIME_RETRY_SECS` | Offline retry delay | `10` |
    /// | `REALTIME_WATCHDOG_SECS` | Watchdog interval | `30` |
    ///
    /// SMTP settings are read separately by `mailer::MailerConfig::from_env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("API_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "sqlite:agency.db?mode=rwc".to_string());

        let realtime_probe_host =
            env::var("REALTIME_PROBE_HOST").unwrap_or_else(|_| "supabase.co".to_string());

        let realtime_retry = seconds("REALTIME_RETRY_SECS", 10)?;
        let realtime_watchdog = seconds("REALTIME_WATCHDOG_SECS", 30)?;

        Ok(Self {
            addr,
            database_url,
            realtime_probe_host,
            realtime_retry,
            realtime_watchdog,
        })
    }
}

fn seconds(var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidSeconds(var)),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API_ADDR format")]
    InvalidAddr,

    #[error("{0} must be a positive number of seconds")]
    InvalidSeconds(&'static str),
}
