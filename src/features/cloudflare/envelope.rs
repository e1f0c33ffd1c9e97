//! Cloudflare v4 API envelope types.

use crate::config::{GuardError, Result, SecurityLevel};
use serde::{Deserialize, Serialize};

/// Body of a `PATCH .../settings/security_level` request.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityLevelPayload {
    pub value: SecurityLevel,
}

/// `result` object of the security level setting endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityLevelSetting {
    pub value: SecurityLevel,
    #[serde(default)]
    pub editable: Option<bool>,
    #[serde(default)]
    pub modified_on: Option<String>,
}

/// Error or message entry in a Cloudflare response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    pub code: i64,
    pub message: String,
}

/// Standard `{success, errors, result}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl ApiResponse {
    /// Parses a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::UnexpectedResponse`] if the body is not a Cloudflare envelope.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| GuardError::UnexpectedResponse(format!("error unmarshalling response: {e}")))
    }

    /// Converts an unsuccessful envelope into an error, keeping the first reported error.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Api`] when `success` is false.
    pub fn into_result(self) -> Result<Option<serde_json::Value>> {
        if self.success {
            return Ok(self.result);
        }
        Err(self.errors.into_iter().next().map_or_else(
            || GuardError::Api {
                code: 0,
                message: "unknown Cloudflare API error".to_string(),
            },
            |first| GuardError::Api {
                code: first.code,
                message: first.message,
            },
        ))
    }

    /// Extracts the security level setting from a successful envelope.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Api`] on failure responses and
    /// [`GuardError::UnexpectedResponse`] when `result` is missing or malformed.
    pub fn into_security_level(self) -> Result<SecurityLevel> {
        let result = self
            .into_result()?
            .ok_or_else(|| GuardError::UnexpectedResponse("missing result".to_string()))?;
        let setting: SecurityLevelSetting = serde_json::from_value(result)
            .map_err(|e| GuardError::UnexpectedResponse(format!("error unmarshalling result: {e}")))?;
        Ok(setting.value)
    }
}
