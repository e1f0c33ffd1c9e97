//! CPU load sampling.
//!
//! `CpuSampler` measures global CPU utilization with `sysinfo` over a short
//! window. On Linux a per-category breakdown is also read from `/proc/stat`
//! to give context when defense mode is about to be enabled.

use crate::config::{GuardError, Result};
use async_trait::async_trait;
use std::time::Duration;
use sysinfo::System;

/// Produces one load reading per call.
///
/// Errors are transient and must never be interpreted as a reading.
#[async_trait]
pub trait LoadSampler: Send + Sync {
    /// Returns the current load as a percentage.
    async fn sample(&mut self) -> Result<f64>;

    /// Optional per-category breakdown for diagnostics.
    fn breakdown(&self) -> Option<CpuBreakdown> {
        None
    }
}

/// Share of CPU time spent per category, as percentages of the total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuBreakdown {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub nice: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
    pub guest: f64,
    pub guest_nice: f64,
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// # Errors
///
/// Returns [`GuardError::Sampler`] if the line is missing, malformed, or sums to zero.
#[allow(clippy::cast_precision_loss)]
pub fn parse_proc_stat(contents: &str) -> Result<CpuBreakdown> {
    let line = contents
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| GuardError::Sampler("no CPU statistics available".to_string()))?;

    let mut fields = [0.0_f64; 10];
    for (slot, raw) in fields.iter_mut().zip(line.split_whitespace().skip(1)) {
        *slot = raw
            .parse::<u64>()
            .map_err(|e| GuardError::Sampler(format!("malformed /proc/stat field '{raw}': {e}")))?
            as f64;
    }

    let total: f64 = fields.iter().sum();
    if total <= 0.0 {
        return Err(GuardError::Sampler(
            "invalid CPU statistics (total <= 0)".to_string(),
        ));
    }

    let pct = |v: f64| v / total * 100.0;
    Ok(CpuBreakdown {
        user: pct(fields[0]),
        nice: pct(fields[1]),
        system: pct(fields[2]),
        idle: pct(fields[3]),
        iowait: pct(fields[4]),
        irq: pct(fields[5]),
        softirq: pct(fields[6]),
        steal: pct(fields[7]),
        guest: pct(fields[8]),
        guest_nice: pct(fields[9]),
    })
}

/// Host CPU sampler backed by the `sysinfo` crate.
pub struct CpuSampler {
    system: System,
    window: Duration,
}

impl std::fmt::Debug for CpuSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuSampler")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl CpuSampler {
    /// Creates a sampler measuring over `window`.
    ///
    /// The window is raised to sysinfo's minimum CPU update interval if shorter.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system,
            window: window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

#[async_trait]
impl LoadSampler for CpuSampler {
    async fn sample(&mut self) -> Result<f64> {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(self.window).await;
        self.system.refresh_cpu_usage();

        if self.system.cpus().is_empty() {
            return Err(GuardError::Sampler(
                "no CPU utilization data available".to_string(),
            ));
        }

        let usage = f64::from(self.system.global_cpu_usage());
        if !usage.is_finite() {
            return Err(GuardError::Sampler(format!(
                "non-finite CPU utilization: {usage}"
            )));
        }
        Ok(usage.clamp(0.0, 100.0))
    }

    fn breakdown(&self) -> Option<CpuBreakdown> {
        std::fs::read_to_string("/proc/stat")
            .ok()
            .and_then(|contents| parse_proc_stat(&contents).ok())
    }
}
