//! Configuration management.
//!
//! Loads configuration from environment variables using dotenvy.
//! All settings are loaded and validated once at startup and stored in an Arc.

mod error;
mod settings;

pub use error::{GuardError, Result};
pub use settings::{Config, SecurityLevel};
