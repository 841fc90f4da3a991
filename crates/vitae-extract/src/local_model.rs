//! Local model extraction backend (Ollama-style API).
//!
//! Fast and free, but only as reliable as the box it runs on: the chain
//! probes `/api/tags` (healthy iff at least one model is installed)
//! before paying for a generate call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use vitae_core::defaults::{
    LOCAL_CONFIDENCE_STRUCTURED, LOCAL_CONFIDENCE_TEXT, LOCAL_EXTRACT_TIMEOUT_SECS,
    LOCAL_GEN_MODEL, OLLAMA_URL, PROBE_TIMEOUT_SECS,
};

use crate::provider::{ExtractionInput, ExtractionProvider, ProviderFailure, RawExtraction};

/// Provider identifier for the local model backend.
pub const LOCAL_MODEL_ID: &str = "local-model";

/// How much document text goes into the extraction prompt.
const PROMPT_TEXT_LIMIT: usize = 2000;

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama-backed extraction provider.
pub struct LocalModelProvider {
    client: Client,
    base_url: String,
    model: String,
    extract_timeout: Duration,
}

impl LocalModelProvider {
    pub fn new(base_url: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(LOCAL_EXTRACT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "extract",
            component = "local_model",
            base_url = %base_url,
            model = %model,
            "Initializing local model provider"
        );

        Self {
            client,
            base_url,
            model,
            extract_timeout: Duration::from_secs(LOCAL_EXTRACT_TIMEOUT_SECS),
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VITAE_OLLAMA_URL` | `http://127.0.0.1:11434` |
    /// | `VITAE_LOCAL_MODEL` | `llama3.2:3b` |
    /// | `VITAE_LOCAL_TIMEOUT_SECS` | `90` |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("VITAE_OLLAMA_URL").unwrap_or_else(|_| OLLAMA_URL.to_string());
        let model =
            std::env::var("VITAE_LOCAL_MODEL").unwrap_or_else(|_| LOCAL_GEN_MODEL.to_string());

        let mut provider = Self::new(base_url, model);
        if let Some(timeout) = std::env::var("VITAE_LOCAL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            provider.extract_timeout = Duration::from_secs(timeout);
        }
        provider
    }

    /// Override the base URL (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn build_prompt(text: &str) -> String {
        let mut end = text.len().min(PROMPT_TEXT_LIMIT);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            r#"Extract structured information from the following resume text and return it as JSON with these fields:

{{
  "contact_info": {{
    "name": "Full name",
    "email": "email@domain.com",
    "phone": "phone number",
    "location": "city, state"
  }},
  "summary": "Professional summary or objective",
  "experience": [
    {{"company": "Company name", "position": "Job title", "duration": "Start - End dates", "description": "Job description and achievements"}}
  ],
  "education": [
    {{"degree": "Degree type", "institution": "School name", "year": "Graduation year"}}
  ],
  "skills": ["List of skills"]
}}

Resume text:
{}"#,
            &text[..end]
        )
    }
}

#[async_trait]
impl ExtractionProvider for LocalModelProvider {
    fn id(&self) -> &str {
        LOCAL_MODEL_ID
    }

    fn probe_timeout(&self) -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }

    fn extract_timeout(&self) -> Duration {
        self.extract_timeout
    }

    /// Healthy iff the server answers and has at least one model
    /// installed.
    async fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<TagsResponse>().await {
                    Ok(tags) => {
                        debug!(
                            subsystem = "extract",
                            component = "local_model",
                            op = "probe",
                            models = tags.models.len(),
                            "Local model probe succeeded"
                        );
                        !tags.models.is_empty()
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "extract",
                            component = "local_model",
                            op = "probe",
                            error = %e,
                            "Local model tags response unreadable"
                        );
                        false
                    }
                }
            }
            Ok(response) => {
                warn!(
                    subsystem = "extract",
                    component = "local_model",
                    op = "probe",
                    status = response.status().as_u16(),
                    "Local model probe returned non-success"
                );
                false
            }
            Err(e) => {
                debug!(
                    subsystem = "extract",
                    component = "local_model",
                    op = "probe",
                    error = %e,
                    "Local model unreachable"
                );
                false
            }
        }
    }

    async fn extract(
        &self,
        input: &ExtractionInput,
    ) -> std::result::Result<RawExtraction, ProviderFailure> {
        let text = input.text().ok_or(ProviderFailure::Empty)?;

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "prompt": Self::build_prompt(text),
                "stream": false,
                "options": {
                    "temperature": 0.1,
                    "top_p": 0.9,
                    "num_predict": 800
                }
            }))
            .send()
            .await
            .map_err(|e| ProviderFailure::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderFailure::Http(format!(
                "generate returned {}",
                response.status()
            )));
        }

        let generated = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ProviderFailure::Malformed(e.to_string()))?;

        if generated.response.trim().is_empty() {
            return Err(ProviderFailure::Empty);
        }

        Ok(RawExtraction {
            structured: None,
            body: Some(generated.response),
            source_text: Some(text.to_string()),
            provider: format!("{}:{}", LOCAL_MODEL_ID, self.model),
            confidence_structured: LOCAL_CONFIDENCE_STRUCTURED,
            confidence_text: LOCAL_CONFIDENCE_TEXT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_truncates_long_documents() {
        let text = "a".repeat(10_000);
        let prompt = LocalModelProvider::build_prompt(&text);
        assert!(prompt.len() < 3_000);
        assert!(prompt.contains("contact_info"));
    }

    #[test]
    fn prompt_contains_document_text() {
        let prompt = LocalModelProvider::build_prompt("Jane Doe, engineer");
        assert!(prompt.contains("Jane Doe, engineer"));
    }

    #[tokio::test]
    async fn extract_without_text_is_empty_failure() {
        let provider = LocalModelProvider::new("http://127.0.0.1:1".into(), "m".into());
        let result = provider.extract(&ExtractionInput::default()).await;
        assert!(matches!(result, Err(ProviderFailure::Empty)));
    }
}
