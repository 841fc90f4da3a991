//! Remote extraction service backend.
//!
//! Highest-quality provider with the contract:
//! `GET /health` → `{status, ...}` (available only when healthy),
//! `POST /extract` (multipart: file bytes + provider preference),
//! `POST /enhance` (JSON; degraded responses carry `skipped: true`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use vitae_core::defaults::{
    PROBE_TIMEOUT_SECS, REMOTE_CONFIDENCE, REMOTE_EXTRACT_TIMEOUT_SECS, REMOTE_SERVICE_URL,
};

use crate::provider::{ExtractionInput, ExtractionProvider, ProviderFailure, RawExtraction};

/// Provider identifier for the remote extraction service.
pub const REMOTE_SERVICE_ID: &str = "remote-service";

/// Remote extraction service client.
pub struct RemoteServiceProvider {
    client: Client,
    base_url: String,
    extract_timeout: Duration,
}

impl RemoteServiceProvider {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REMOTE_EXTRACT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "extract",
            component = "remote",
            base_url = %base_url,
            "Initializing remote service provider"
        );

        Self {
            client,
            base_url,
            extract_timeout: Duration::from_secs(REMOTE_EXTRACT_TIMEOUT_SECS),
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VITAE_REMOTE_SERVICE_URL` | `http://127.0.0.1:8001` |
    /// | `VITAE_REMOTE_TIMEOUT_SECS` | `60` |
    pub fn from_env() -> Self {
        let base_url = std::env::var("VITAE_REMOTE_SERVICE_URL")
            .unwrap_or_else(|_| REMOTE_SERVICE_URL.to_string());

        let mut provider = Self::new(base_url);
        if let Some(timeout) = std::env::var("VITAE_REMOTE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            provider.extract_timeout = Duration::from_secs(timeout);
        }
        provider
    }

    /// The base URL this provider talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn file_name(file_ref: &str) -> String {
        file_ref
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty())
            .unwrap_or("resume.pdf")
            .to_string()
    }
}

#[async_trait]
impl ExtractionProvider for RemoteServiceProvider {
    fn id(&self) -> &str {
        REMOTE_SERVICE_ID
    }

    fn probe_timeout(&self) -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }

    fn extract_timeout(&self) -> Duration {
        self.extract_timeout
    }

    /// Available only when `/health` answers with a healthy status.
    async fn probe(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<JsonValue>().await {
                    Ok(body) => {
                        let healthy = body
                            .get("status")
                            .and_then(JsonValue::as_str)
                            .map(|s| s == "healthy" || s == "ok")
                            .unwrap_or(false);
                        debug!(
                            subsystem = "extract",
                            component = "remote",
                            op = "probe",
                            healthy,
                            "Remote service probe answered"
                        );
                        healthy
                    }
                    Err(_) => false,
                }
            }
            Ok(response) => {
                warn!(
                    subsystem = "extract",
                    component = "remote",
                    op = "probe",
                    status = response.status().as_u16(),
                    "Remote service health check returned non-success"
                );
                false
            }
            Err(e) => {
                debug!(
                    subsystem = "extract",
                    component = "remote",
                    op = "probe",
                    error = %e,
                    "Remote service unreachable"
                );
                false
            }
        }
    }

    async fn extract(
        &self,
        input: &ExtractionInput,
    ) -> std::result::Result<RawExtraction, ProviderFailure> {
        let bytes = input
            .file_bytes
            .clone()
            .ok_or_else(|| ProviderFailure::Unavailable("file bytes not available".into()))?;

        let form = Form::new()
            .part(
                "file",
                Part::bytes(bytes).file_name(Self::file_name(&input.file_ref)),
            )
            .text("provider", "auto");

        let url = format!("{}/extract", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderFailure::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .json::<JsonValue>()
            .await
            .map_err(|e| ProviderFailure::Malformed(e.to_string()))?;

        if !status.is_success() {
            // Failure contract: {error, provider_tried}
            let error = body
                .get("error")
                .and_then(JsonValue::as_str)
                .unwrap_or("extraction failed");
            return Err(ProviderFailure::Http(format!("{} ({})", error, status)));
        }

        if let Some(error) = body.get("error").and_then(JsonValue::as_str) {
            return Err(ProviderFailure::Malformed(error.to_string()));
        }

        let structured = body
            .get("structured_data")
            .or_else(|| body.get("data"))
            .cloned()
            .filter(|v| v.is_object())
            .ok_or_else(|| ProviderFailure::Malformed("no structured payload".into()))?;

        let source_text = body
            .get("original_text")
            .or_else(|| body.get("text"))
            .or_else(|| body.get("raw_text"))
            .and_then(JsonValue::as_str)
            .map(String::from)
            .or_else(|| input.raw_text.clone());

        let provider = body
            .get("provider_used")
            .and_then(JsonValue::as_str)
            .unwrap_or(REMOTE_SERVICE_ID)
            .to_string();

        Ok(RawExtraction {
            structured: Some(structured),
            body: None,
            source_text,
            provider,
            confidence_structured: REMOTE_CONFIDENCE,
            confidence_text: REMOTE_CONFIDENCE,
        })
    }
}
