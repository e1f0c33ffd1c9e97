//! Configuration settings.
//!
//! Defines the main `Config` struct and environment variable loading logic.

use super::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare zone security level.
///
/// Possible values: off, essentially_off, low, medium, high, under_attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    Off,
    EssentiallyOff,
    Low,
    Medium,
    High,
    UnderAttack,
}

impl SecurityLevel {
    /// Wire name used by the Cloudflare settings API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::EssentiallyOff => "essentially_off",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::UnderAttack => "under_attack",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityLevel {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "essentially_off" => Ok(Self::EssentiallyOff),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "under_attack" => Ok(Self::UnderAttack),
            other => Err(GuardError::Config(format!(
                "unknown security level '{other}'"
            ))),
        }
    }
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn get_env(key: &str) -> Result<String> {
    get_env_opt(key)
        .ok_or_else(|| GuardError::Config(format!("{key} environment variable is required")))
}

fn get_env_or(key: &str, default: &str) -> String {
    get_env_opt(key).unwrap_or_else(|| default.to_string())
}

fn get_env_parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get_env_opt(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| GuardError::Config(format!("invalid {key} value: {e}")))
    })
}

fn ensure_at_least(key: &str, value: u64, min: u64, unit: &str) -> Result<()> {
    if value < min {
        return Err(GuardError::Config(format!(
            "{key} must be at least {min}{unit}"
        )));
    }
    Ok(())
}

/// Application configuration loaded from environment.
#[derive(Clone)]
pub struct Config {
    /// Cloudflare global API key.
    pub cloudflare_api_key: String,
    /// Email of the Cloudflare account owning the key.
    pub cloudflare_email: String,
    /// Zone whose security level is toggled.
    pub cloudflare_zone_id: String,
    /// Base URL of the Cloudflare v4 API.
    pub cloudflare_api_base_url: String,
    /// Per-request timeout for Cloudflare calls, in seconds.
    pub cloudflare_timeout_secs: u64,
    /// Security level restored when defense is lifted.
    pub normal_security_level: SecurityLevel,
    /// CPU percentage at or above which a reading counts as high (1-100).
    pub cpu_threshold: u8,
    /// Seconds between ticks.
    pub monitoring_interval_secs: u64,
    /// Consecutive high readings before Under Attack mode is enabled.
    pub required_high_readings: u32,
    /// Consecutive low readings before Under Attack mode is disabled.
    pub required_low_readings: u32,
    /// Measurement window of a single CPU sample, in milliseconds.
    pub cpu_sample_window_ms: u64,
    /// Webhook URL for transition notifications.
    pub webhook_url: Option<String>,
    /// Bearer token sent with webhook notifications.
    pub webhook_token: Option<String>,
    /// Logging format: "json" or "pretty".
    pub log_format: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("cloudflare_api_key", &"[redacted]")
            .field("cloudflare_email", &self.cloudflare_email)
            .field("cloudflare_zone_id", &self.cloudflare_zone_id)
            .field("cloudflare_api_base_url", &self.cloudflare_api_base_url)
            .field("cloudflare_timeout_secs", &self.cloudflare_timeout_secs)
            .field("normal_security_level", &self.normal_security_level)
            .field("cpu_threshold", &self.cpu_threshold)
            .field("monitoring_interval_secs", &self.monitoring_interval_secs)
            .field("required_high_readings", &self.required_high_readings)
            .field("required_low_readings", &self.required_low_readings)
            .field("cpu_sample_window_ms", &self.cpu_sample_window_ms)
            .field("webhook_url", &self.webhook_url)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads and validates configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`] when:
    /// - `CF_API_KEY`, `CF_EMAIL` or `CF_ZONE_ID` is missing or empty
    /// - `CPU_THRESHOLD` is not an integer between 1 and 100
    /// - `MONITORING_INTERVAL` is not an integer of at least 1 second
    /// - `REQUIRED_HIGH_READINGS` or `REQUIRED_LOW_READINGS` is below 1
    /// - `CF_NORMAL_SECURITY_LEVEL` is unknown or `under_attack`
    pub fn from_env() -> Result<Arc<Self>> {
        let cloudflare_api_key = get_env("CF_API_KEY")?;
        let cloudflare_email = get_env("CF_EMAIL")?;
        let cloudflare_zone_id = get_env("CF_ZONE_ID")?;

        let cpu_threshold: u8 = get_env_parsed_or("CPU_THRESHOLD", 80)?;
        if !(1..=100).contains(&cpu_threshold) {
            return Err(GuardError::Config(
                "CPU_THRESHOLD must be between 1 and 100".to_string(),
            ));
        }

        let monitoring_interval_secs: u64 = get_env_parsed_or("MONITORING_INTERVAL", 10)?;
        ensure_at_least("MONITORING_INTERVAL", monitoring_interval_secs, 1, " second")?;

        let required_high_readings: u32 = get_env_parsed_or("REQUIRED_HIGH_READINGS", 3)?;
        ensure_at_least(
            "REQUIRED_HIGH_READINGS",
            u64::from(required_high_readings),
            1,
            "",
        )?;

        let required_low_readings: u32 = get_env_parsed_or("REQUIRED_LOW_READINGS", 5)?;
        ensure_at_least(
            "REQUIRED_LOW_READINGS",
            u64::from(required_low_readings),
            1,
            "",
        )?;

        let cloudflare_timeout_secs: u64 = get_env_parsed_or("CF_REQUEST_TIMEOUT_SECS", 10)?;
        ensure_at_least("CF_REQUEST_TIMEOUT_SECS", cloudflare_timeout_secs, 1, " second")?;

        let cpu_sample_window_ms: u64 = get_env_parsed_or("CPU_SAMPLE_WINDOW_MS", 1000)?;
        ensure_at_least("CPU_SAMPLE_WINDOW_MS", cpu_sample_window_ms, 200, "ms")?;

        let normal_security_level: SecurityLevel = get_env_or("CF_NORMAL_SECURITY_LEVEL", "medium")
            .parse()
            .map_err(|e| GuardError::Config(format!("invalid CF_NORMAL_SECURITY_LEVEL value: {e}")))?;
        if normal_security_level == SecurityLevel::UnderAttack {
            return Err(GuardError::Config(
                "CF_NORMAL_SECURITY_LEVEL cannot be under_attack".to_string(),
            ));
        }

        Ok(Arc::new(Self {
            cloudflare_api_key,
            cloudflare_email,
            cloudflare_zone_id,
            cloudflare_api_base_url: get_env_or("CF_API_BASE_URL", DEFAULT_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            cloudflare_timeout_secs,
            normal_security_level,
            cpu_threshold,
            monitoring_interval_secs,
            required_high_readings,
            required_low_readings,
            cpu_sample_window_ms,
            webhook_url: get_env_opt("WEBHOOK_URL"),
            webhook_token: get_env_opt("WEBHOOK_TOKEN"),
            log_format: get_env_or("LOG_FORMAT", "json"),
        }))
    }

    /// Tick cadence of the supervisor.
    #[must_use]
    pub const fn monitoring_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring_interval_secs)
    }

    /// Timeout applied to every Cloudflare request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.cloudflare_timeout_secs)
    }

    /// Window over which one CPU sample is measured.
    #[must_use]
    pub const fn sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_window_ms)
    }
}
