//! Minimal stub provider.
//!
//! Always succeeds with a placeholder structured record at near-zero
//! confidence. Sits at the end of the chain so exhausting every real
//! provider still yields a terminal `completed` state instead of an
//! error.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use vitae_core::defaults::STUB_CONFIDENCE;

use crate::provider::{ExtractionInput, ExtractionProvider, ProviderFailure, RawExtraction};

/// Provider identifier for the stub.
pub const STUB_ID: &str = "stub";

pub struct StubProvider;

#[async_trait]
impl ExtractionProvider for StubProvider {
    fn id(&self) -> &str {
        STUB_ID
    }

    fn requires_probe(&self) -> bool {
        false
    }

    fn extract_timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn probe(&self) -> bool {
        true
    }

    async fn extract(
        &self,
        input: &ExtractionInput,
    ) -> std::result::Result<RawExtraction, ProviderFailure> {
        let name = if input.title.trim().is_empty() {
            "Unknown".to_string()
        } else {
            input.title.clone()
        };

        Ok(RawExtraction {
            structured: Some(json!({
                "contact_info": {
                    "name": name,
                    "email": null,
                    "phone": null,
                    "location": null
                },
                "summary": "Unable to extract summary - please review manually",
                "skills": [],
                "experience": [],
                "education": [],
                "raw_text": "Text extraction failed"
            })),
            body: None,
            source_text: None,
            provider: STUB_ID.to_string(),
            confidence_structured: STUB_CONFIDENCE,
            confidence_text: STUB_CONFIDENCE,
        })
    }
}
