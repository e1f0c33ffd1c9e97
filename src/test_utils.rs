//! Test utilities and shared configuration.
//!
//! This module provides common helpers for unit tests, reducing duplication
//! across the codebase.

#[cfg(any(test, feature = "testing"))]
use crate::config::{Config, SecurityLevel};
#[cfg(any(test, feature = "testing"))]
use std::sync::Arc;

/// Creates a standard configuration for testing purposes.
///
/// This configuration has:
/// - Dummy Cloudflare credentials for zone `zone-test`
/// - Threshold 80%, 3 high / 5 low readings
/// - A one second cadence and no webhook
#[cfg(any(test, feature = "testing"))]
#[must_use]
pub fn create_test_config() -> Arc<Config> {
    Arc::new(Config {
        cloudflare_api_key: "test-key".to_string(),
        cloudflare_email: "ops@example.com".to_string(),
        cloudflare_zone_id: "zone-test".to_string(),
        cloudflare_api_base_url: "http://127.0.0.1:9/client/v4".to_string(),
        cloudflare_timeout_secs: 2,
        normal_security_level: SecurityLevel::Medium,
        cpu_threshold: 80,
        monitoring_interval_secs: 1,
        required_high_readings: 3,
        required_low_readings: 5,
        cpu_sample_window_ms: 200,
        webhook_url: None,
        webhook_token: None,
        log_format: "pretty".to_string(),
    })
}
