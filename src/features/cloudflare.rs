//! Cloudflare zone security level integration.
//!
//! Provides the `Actuator` seam used by the defense supervisor and its
//! Cloudflare-backed implementation, which flips the zone between
//! "Under Attack" and a configured normal security level.

mod client;
mod envelope;

use crate::config::{Result, SecurityLevel};
use async_trait::async_trait;

pub use client::CloudflareClient;
pub use envelope::{ApiMessage, ApiResponse, SecurityLevelPayload, SecurityLevelSetting};

/// Remote protective switch driven by the defense controller.
///
/// `enable` and `disable` must be idempotent: calling either when the remote
/// side is already in that state succeeds without error.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Switches the remote side into its defensive mode.
    async fn enable(&self) -> Result<()>;

    /// Returns the remote side to its normal mode.
    async fn disable(&self) -> Result<()>;

    /// Reports the currently active remote security level.
    async fn current_state(&self) -> Result<SecurityLevel>;
}
