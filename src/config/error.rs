//! Error types and result aliases.
//!
//! Defines the core `GuardError` enumeration and common `Result` type.

use thiserror::Error;

/// Errors raised by the load guard and its collaborators.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Missing or invalid setting; fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// CPU load could not be measured this tick.
    #[error("sampler error: {0}")]
    Sampler(String),

    /// Transport-level failure talking to the Cloudflare API.
    #[error("http error: {0}")]
    Http(String),

    /// Cloudflare answered with `success: false`.
    #[error("Cloudflare API error: {message} (code: {code})")]
    Api { code: i64, message: String },

    /// Response body did not match the Cloudflare envelope.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Webhook notification error.
    #[error("webhook error: {0}")]
    Webhook(String),
}

/// Result type alias for `GuardError`.
pub type Result<T> = std::result::Result<T, GuardError>;
