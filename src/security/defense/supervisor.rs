//! Lifecycle supervisor.
//!
//! Owns the tick cadence and the controller state. Each tick samples the CPU,
//! feeds the controller and performs any requested Cloudflare call before the
//! next tick may start. Shutdown is requested through a one-shot channel that
//! is observed between ticks and during the startup state query. On shutdown
//! a defensive zone is restored with exactly one best-effort `disable` call,
//! and the supervisor stays in `ShuttingDown` from then on.

use super::controller::{
    ActuationOutcome, DefenseController, DefenseMode, Direction, TransitionRequest,
};
use crate::config::{Config, SecurityLevel};
use crate::features::cloudflare::Actuator;
use crate::features::sampler::LoadSampler;
use crate::features::webhook::{EventType, WebhookNotifier, WebhookPayload};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Supervisor lifecycle; `ShuttingDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    ShuttingDown,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The sampler failed; counters and mode are untouched.
    SampleSkipped,
    /// Reading recorded, no transition requested.
    Observed { load: f64 },
    /// Transition requested and applied remotely.
    Transitioned { direction: Direction, load: f64 },
    /// Transition requested but the remote call failed.
    ActuationFailed { direction: Direction, load: f64 },
    /// The supervisor is shutting down; nothing was sampled.
    Stopped,
}

/// Result of the shutdown safety net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Zone was believed normal; nothing to do.
    NotNeeded,
    /// Under Attack mode was lifted.
    Restored,
    /// The disable call failed; the zone may still be under attack mode.
    Failed(String),
}

/// Summary returned once the supervisor has stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    pub final_mode: DefenseMode,
    pub ticks: u64,
    pub skipped_samples: u64,
    pub transitions: u64,
    pub failed_actuations: u64,
    pub reconciliation: Reconciliation,
}

#[derive(Debug, Default, Clone, Copy)]
struct TickStats {
    ticks: u64,
    skipped_samples: u64,
    transitions: u64,
    failed_actuations: u64,
}

pub struct Supervisor {
    controller: DefenseController,
    sampler: Box<dyn LoadSampler>,
    actuator: Arc<dyn Actuator>,
    notifier: Option<WebhookNotifier>,
    interval: Duration,
    state: LifecycleState,
    stats: TickStats,
    report: Option<ShutdownReport>,
}

impl Supervisor {
    /// Creates a supervisor with a fresh `Normal` controller built from `config`.
    #[must_use]
    pub fn new(
        config: &Config,
        sampler: Box<dyn LoadSampler>,
        actuator: Arc<dyn Actuator>,
    ) -> Self {
        Self {
            controller: DefenseController::new(
                config.cpu_threshold,
                config.required_high_readings,
                config.required_low_readings,
            ),
            sampler,
            actuator,
            notifier: None,
            interval: config.monitoring_interval().max(MIN_INTERVAL),
            state: LifecycleState::Running,
            stats: TickStats::default(),
            report: None,
        }
    }

    /// Attaches a webhook notifier for transition events.
    #[must_use]
    pub fn with_notifier(mut self, notifier: WebhookNotifier) -> Self {
        self.notifier = notifier.is_enabled().then_some(notifier);
        self
    }

    /// Overrides the tick cadence. Zero is raised to one millisecond.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    #[must_use]
    pub const fn controller(&self) -> &DefenseController {
        &self.controller
    }

    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Logs the remote security level before monitoring starts.
    pub async fn report_remote_state(&self) -> Option<SecurityLevel> {
        match self.actuator.current_state().await {
            Ok(SecurityLevel::UnderAttack) => {
                warn!(
                    level = %SecurityLevel::UnderAttack,
                    "Zone is already in 'Under Attack Mode'; monitoring starts from normal"
                );
                Some(SecurityLevel::UnderAttack)
            }
            Ok(level) => {
                info!(level = %level, "Current Cloudflare security level");
                Some(level)
            }
            Err(e) => {
                warn!(error = %e, "Could not read current Cloudflare security level");
                None
            }
        }
    }

    /// Runs one sample/decide/act cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.state != LifecycleState::Running {
            return TickOutcome::Stopped;
        }
        self.stats.ticks += 1;

        let load = match self.sampler.sample().await {
            Ok(load) => load,
            Err(e) => {
                self.stats.skipped_samples += 1;
                warn!(error = %e, "Error getting CPU load");
                return TickOutcome::SampleSkipped;
            }
        };

        info!(cpu_load = %format!("{load:.2}"), "Current CPU load");

        match self.controller.observe(load) {
            Some(request) => self.actuate(request).await,
            None => {
                if self.controller.consecutive_high() > 0 {
                    info!(
                        consecutive = self.controller.consecutive_high(),
                        "High CPU load detected"
                    );
                }
                TickOutcome::Observed { load }
            }
        }
    }

    async fn actuate(&mut self, request: TransitionRequest) -> TickOutcome {
        let load = request.sample;
        let result = match request.direction {
            Direction::ToDefensive => {
                warn!(
                    cpu_load = %format!("{load:.2}"),
                    streak = request.streak,
                    "Suspected DDoS attack! Enabling Cloudflare 'Under Attack Mode'"
                );
                if let Some(b) = self.sampler.breakdown() {
                    info!(
                        user = %format!("{:.2}", b.user),
                        system = %format!("{:.2}", b.system),
                        iowait = %format!("{:.2}", b.iowait),
                        softirq = %format!("{:.2}", b.softirq),
                        steal = %format!("{:.2}", b.steal),
                        idle = %format!("{:.2}", b.idle),
                        "CPU time breakdown"
                    );
                }
                self.actuator.enable().await
            }
            Direction::ToNormal => {
                info!(
                    cpu_load = %format!("{load:.2}"),
                    streak = request.streak,
                    "CPU load has returned to normal. Disabling 'Under Attack Mode'"
                );
                self.actuator.disable().await
            }
        };

        match result {
            Ok(()) => {
                self.controller.resolve(&request, ActuationOutcome::Applied);
                self.stats.transitions += 1;
                let (event, message) = match request.direction {
                    Direction::ToDefensive => (
                        EventType::DefenseModeActivated,
                        "Cloudflare 'Under Attack Mode' enabled successfully",
                    ),
                    Direction::ToNormal => (
                        EventType::DefenseModeDeactivated,
                        "Cloudflare 'Under Attack Mode' disabled successfully",
                    ),
                };
                info!(mode = %self.controller.mode(), "{message}");
                self.notify(event, Some(load), format!("{message} (CPU load {load:.2}%)"));
                TickOutcome::Transitioned {
                    direction: request.direction,
                    load,
                }
            }
            Err(e) => {
                self.controller.resolve(&request, ActuationOutcome::Failed);
                self.stats.failed_actuations += 1;
                error!(
                    error = %e,
                    direction = %request.direction,
                    mode = %self.controller.mode(),
                    "Error updating 'Under Attack Mode'; streak must be re-earned before retrying"
                );
                self.notify(
                    EventType::ActuationFailed,
                    Some(load),
                    format!("Failed to apply {}: {e}", request.direction),
                );
                TickOutcome::ActuationFailed {
                    direction: request.direction,
                    load,
                }
            }
        }
    }

    fn notify(&self, event: EventType, load: Option<f64>, message: String) {
        if let Some(notifier) = &self.notifier {
            let severity = match event {
                EventType::DefenseModeActivated | EventType::ShutdownReconcileFailed => 5,
                EventType::ActuationFailed => 4,
                EventType::DefenseModeDeactivated | EventType::ShutdownReconciled => 3,
            };
            notifier.notify(WebhookPayload::now(event, load, severity, message));
        }
    }

    /// Runs the cadence until `shutdown` fires (or its sender is dropped),
    /// then reconciles the remote state once.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> ShutdownReport {
        info!(
            threshold = self.controller.threshold(),
            interval_secs = self.interval.as_secs_f64(),
            "Starting CPU monitoring"
        );
        let interrupted = tokio::select! {
            biased;
            _ = &mut shutdown => true,
            _ = self.report_remote_state() => false,
        };
        if interrupted {
            return self.shutdown().await;
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        self.shutdown().await
    }

    /// Enters `ShuttingDown` and performs the single reconciliation attempt.
    ///
    /// Later calls return the first report without touching the actuator.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        if let Some(report) = &self.report {
            return report.clone();
        }
        self.state = LifecycleState::ShuttingDown;
        info!("Shutting down...");

        let reconciliation = if self.controller.mode() == DefenseMode::Defensive {
            info!("Attempting to disable 'Under Attack Mode' before exiting...");
            match self.actuator.disable().await {
                Ok(()) => {
                    info!("Cloudflare 'Under Attack Mode' disabled successfully");
                    Reconciliation::Restored
                }
                Err(e) => {
                    error!(error = %e, "Error disabling 'Under Attack Mode' on shutdown");
                    Reconciliation::Failed(e.to_string())
                }
            }
        } else {
            Reconciliation::NotNeeded
        };

        if let Some(notifier) = &self.notifier {
            let payload = match &reconciliation {
                Reconciliation::NotNeeded => None,
                Reconciliation::Restored => Some(WebhookPayload::now(
                    EventType::ShutdownReconciled,
                    None,
                    3,
                    "Monitor stopped; 'Under Attack Mode' disabled".to_string(),
                )),
                Reconciliation::Failed(e) => Some(WebhookPayload::now(
                    EventType::ShutdownReconcileFailed,
                    None,
                    5,
                    format!("Monitor stopped but 'Under Attack Mode' could not be disabled: {e}"),
                )),
            };
            if let Some(payload) = payload {
                notifier.deliver(payload).await;
            }
        }

        if reconciliation == Reconciliation::Restored {
            self.controller.restore_normal();
        }

        let report = ShutdownReport {
            final_mode: self.controller.mode(),
            ticks: self.stats.ticks,
            skipped_samples: self.stats.skipped_samples,
            transitions: self.stats.transitions,
            failed_actuations: self.stats.failed_actuations,
            reconciliation,
        };
        self.report = Some(report.clone());
        report
    }
}

/// Registers SIGINT/SIGTERM handlers and returns a receiver that fires on the first one.
///
/// # Errors
///
/// Returns an error if the OS signal handlers cannot be installed.
pub fn install_signal_handlers() -> std::io::Result<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            info!(signal = name, "Termination signal received");
            let _ = tx.send(());
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!(signal = "ctrl_c", "Termination signal received"),
                Err(e) => error!(error = %e, "Failed to listen for ctrl_c"),
            }
            let _ = tx.send(());
        });
    }

    Ok(rx)
}
