//! Library definitions.
//!
//! Exports the configuration, external collaborators, and the debounced
//! defense controller with its lifecycle supervisor.

pub mod config;
pub mod features;
pub mod security;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;
pub use config::{Config, GuardError, Result, SecurityLevel};
pub use features::cloudflare::{Actuator, CloudflareClient};
pub use features::sampler::{CpuBreakdown, CpuSampler, LoadSampler};
pub use features::webhook::{EventType, WebhookNotifier, WebhookPayload};
pub use security::defense::{
    ActuationOutcome, DefenseController, DefenseMode, Direction, Reconciliation, ShutdownReport,
    Supervisor, TickOutcome, TransitionRequest, install_signal_handlers,
};
