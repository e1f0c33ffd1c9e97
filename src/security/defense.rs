//! Defense mode management.
//!
//! Debounces CPU readings into Under Attack mode transitions and supervises
//! the monitoring loop through to a safe shutdown.

mod controller;
mod supervisor;

pub use controller::{
    ActuationOutcome, DefenseController, DefenseMode, Direction, TransitionRequest, Trigger,
};
pub use supervisor::{
    LifecycleState, Reconciliation, ShutdownReport, Supervisor, TickOutcome,
    install_signal_handlers,
};
