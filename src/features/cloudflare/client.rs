//! Cloudflare API client.
//!
//! Issues the security level PATCH/GET calls against a single zone.

use super::Actuator;
use super::envelope::{ApiResponse, SecurityLevelPayload};
use crate::config::{Config, GuardError, Result, SecurityLevel};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info};

#[derive(Clone)]
pub struct CloudflareClient {
    client: Client,
    base_url: String,
    zone_id: String,
    email: String,
    api_key: String,
    normal_level: SecurityLevel,
}

impl CloudflareClient {
    /// Creates a client for the zone named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GuardError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.cloudflare_api_base_url.clone(),
            zone_id: config.cloudflare_zone_id.clone(),
            email: config.cloudflare_email.clone(),
            api_key: config.cloudflare_api_key.clone(),
            normal_level: config.normal_security_level,
        })
    }

    /// Security level restored by [`Actuator::disable`].
    #[must_use]
    pub const fn normal_level(&self) -> SecurityLevel {
        self.normal_level
    }

    fn settings_url(&self) -> String {
        format!(
            "{}/zones/{}/settings/security_level",
            self.base_url, self.zone_id
        )
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("X-Auth-Email", &self.email)
            .header("X-Auth-Key", &self.api_key)
            .header("Content-Type", "application/json")
    }

    async fn execute(&self, req: RequestBuilder) -> Result<ApiResponse> {
        let resp = req
            .send()
            .await
            .map_err(|e| GuardError::Http(format!("error executing request: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GuardError::Http(format!("error reading response body: {e}")))?;

        debug!(status = %status, bytes = body.len(), "Cloudflare response received");
        ApiResponse::parse(&body)
    }

    /// Sets the zone security level.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or when Cloudflare rejects the change.
    pub async fn set_security_level(&self, level: SecurityLevel) -> Result<()> {
        let req = self
            .authorized(self.client.patch(self.settings_url()))
            .json(&SecurityLevelPayload { value: level });

        self.execute(req).await?.into_result()?;
        info!(level = %level, zone_id = %self.zone_id, "Cloudflare security level updated");
        Ok(())
    }

    /// Reads the zone security level.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, API failure or an unparsable result.
    pub async fn security_level(&self) -> Result<SecurityLevel> {
        let req = self.authorized(self.client.get(self.settings_url()));
        self.execute(req).await?.into_security_level()
    }
}

#[async_trait]
impl Actuator for CloudflareClient {
    async fn enable(&self) -> Result<()> {
        self.set_security_level(SecurityLevel::UnderAttack).await
    }

    async fn disable(&self) -> Result<()> {
        self.set_security_level(self.normal_level).await
    }

    async fn current_state(&self) -> Result<SecurityLevel> {
        self.security_level().await
    }
}
