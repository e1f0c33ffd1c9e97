//! External collaborators.
//!
//! CPU sampling, the Cloudflare actuator, and webhook notifications.

pub mod cloudflare;
pub mod sampler;
pub mod webhook;
