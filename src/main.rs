//! `loadguard` - CPU load monitor that drives Cloudflare "Under Attack" mode.
//!
//! Copyright (C) 2026 Maverick
//! SPDX-License-Identifier: AGPL-3.0-only
//!
//! Loads configuration, sets up logging, and runs the defense supervisor
//! until a termination signal arrives.

use loadguard::{
    CloudflareClient, Config, CpuSampler, Supervisor, WebhookNotifier, install_signal_handlers,
};

use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking);

    if log_format.eq_ignore_ascii_case("pretty") {
        subscriber.init();
    } else {
        subscriber.json().init();
    }

    if !dotenv_loaded {
        warn!(".env file not found, will use system environment variables");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        zone_id = %config.cloudflare_zone_id,
        cpu_threshold = config.cpu_threshold,
        monitoring_interval_secs = config.monitoring_interval_secs,
        required_high_readings = config.required_high_readings,
        required_low_readings = config.required_low_readings,
        normal_security_level = %config.normal_security_level,
        log_format = %config.log_format,
        "Monitor initialized"
    );

    let actuator = match CloudflareClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to create Cloudflare client");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = match install_signal_handlers() {
        Ok(rx) => rx,
        Err(e) => {
            error!(error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let sampler = Box::new(CpuSampler::new(config.sample_window()));
    let supervisor = Supervisor::new(&config, sampler, actuator)
        .with_notifier(WebhookNotifier::new(&config));

    let report = supervisor.run(shutdown).await;
    info!(
        final_mode = %report.final_mode,
        ticks = report.ticks,
        skipped_samples = report.skipped_samples,
        transitions = report.transitions,
        failed_actuations = report.failed_actuations,
        reconciliation = ?report.reconciliation,
        "CPU monitoring stopped. Goodbye!"
    );

    ExitCode::SUCCESS
}
