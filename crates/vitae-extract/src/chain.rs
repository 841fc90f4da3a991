//! The extraction strategy chain.
//!
//! Ordered, fault-tolerant cascade over [`ExtractionProvider`]s. Each
//! provider is probed under a short deadline before its expensive path
//! runs; probe failures, timeouts, malformed responses, and empty
//! results all fall through to the next provider. The chain never
//! errors outward — exhausting every provider yields the minimal stub
//! record.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::timeout;
use tracing::{info, warn};

use vitae_core::defaults::STUB_CONFIDENCE;
use vitae_core::CanonicalResume;

use crate::heuristic::HeuristicProvider;
use crate::local_model::LocalModelProvider;
use crate::normalize::canonicalize;
use crate::provider::{ExtractionInput, ExtractionProvider, ProviderFailure};
use crate::remote::RemoteServiceProvider;
use crate::stub::{StubProvider, STUB_ID};

/// One skipped provider and why it was skipped.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: String,
    pub failure: ProviderFailure,
}

/// Result of running the chain: an accepted canonical record plus the
/// trail of providers that fell through before it.
#[derive(Debug)]
pub struct ChainOutcome {
    pub canonical: CanonicalResume,
    pub attempts: Vec<ProviderAttempt>,
}

/// Ordered extraction cascade.
pub struct ExtractionChain {
    providers: Vec<Arc<dyn ExtractionProvider>>,
}

impl ExtractionChain {
    pub fn new(providers: Vec<Arc<dyn ExtractionProvider>>) -> Self {
        Self { providers }
    }

    /// The standard four-tier chain: local model, remote service,
    /// heuristic parser, stub.
    pub fn standard(local: LocalModelProvider, remote: RemoteServiceProvider) -> Self {
        Self::new(vec![
            Arc::new(local),
            Arc::new(remote),
            Arc::new(HeuristicProvider),
            Arc::new(StubProvider),
        ])
    }

    /// Build the standard chain from environment configuration.
    pub fn from_env() -> Self {
        Self::standard(LocalModelProvider::from_env(), RemoteServiceProvider::from_env())
    }

    /// Registered provider identifiers, in cascade order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Run the cascade.
    ///
    /// `preference` moves the named provider to the front; the rest of
    /// the chain keeps its order as fallback.
    pub async fn run(&self, input: &ExtractionInput, preference: Option<&str>) -> ChainOutcome {
        let mut attempts = Vec::new();

        let order: Vec<&Arc<dyn ExtractionProvider>> = match preference {
            Some(preferred) => {
                let mut ordered: Vec<&Arc<dyn ExtractionProvider>> = self
                    .providers
                    .iter()
                    .filter(|p| p.id() == preferred)
                    .collect();
                ordered.extend(self.providers.iter().filter(|p| p.id() != preferred));
                ordered
            }
            None => self.providers.iter().collect(),
        };

        for provider in order {
            match self.attempt(provider.as_ref(), input).await {
                Ok(canonical) => {
                    info!(
                        subsystem = "extract",
                        component = "chain",
                        op = "accept",
                        provider = %canonical.provider_used,
                        confidence = canonical.confidence,
                        skipped = attempts.len(),
                        "Extraction accepted"
                    );
                    return ChainOutcome {
                        canonical,
                        attempts,
                    };
                }
                Err(failure) => {
                    warn!(
                        subsystem = "extract",
                        component = "chain",
                        op = "fallthrough",
                        provider = provider.id(),
                        error = %failure,
                        "Provider skipped, continuing cascade"
                    );
                    attempts.push(ProviderAttempt {
                        provider: provider.id().to_string(),
                        failure,
                    });
                }
            }
        }

        // Unreachable with the stub registered, but the chain contract
        // is that it never raises outward.
        warn!(
            subsystem = "extract",
            component = "chain",
            op = "exhausted",
            "Every provider fell through; emitting placeholder record"
        );
        ChainOutcome {
            canonical: CanonicalResume::placeholder(&input.title, STUB_ID, STUB_CONFIDENCE),
            attempts,
        }
    }

    async fn attempt(
        &self,
        provider: &dyn ExtractionProvider,
        input: &ExtractionInput,
    ) -> std::result::Result<CanonicalResume, ProviderFailure> {
        let start = Instant::now();

        if provider.requires_probe() {
            match timeout(provider.probe_timeout(), provider.probe()).await {
                Ok(true) => {}
                Ok(false) => {
                    return Err(ProviderFailure::Unavailable(
                        "probe reported unavailable".into(),
                    ))
                }
                Err(_) => {
                    return Err(ProviderFailure::Unavailable(format!(
                        "probe timed out after {:?}",
                        provider.probe_timeout()
                    )))
                }
            }
        }

        let raw = match timeout(provider.extract_timeout(), provider.extract(input)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(failure)) => return Err(failure),
            Err(_) => return Err(ProviderFailure::Timeout(provider.extract_timeout())),
        };

        let canonical = canonicalize(&raw);
        if !canonical.has_substance() {
            return Err(ProviderFailure::Empty);
        }

        info!(
            subsystem = "extract",
            component = "chain",
            op = "extract",
            provider = provider.id(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Provider produced an accepted result"
        );
        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::provider::RawExtraction;

    /// Scriptable provider for cascade tests.
    struct ScriptedProvider {
        id: String,
        probe_ok: bool,
        probe_delay: Duration,
        extract_delay: Duration,
        extract_result: Result<Option<serde_json::Value>, ProviderFailure>,
        extract_called: Arc<AtomicBool>,
        confidence: f32,
    }

    impl ScriptedProvider {
        fn healthy(id: &str, payload: serde_json::Value, confidence: f32) -> Self {
            Self {
                id: id.to_string(),
                probe_ok: true,
                probe_delay: Duration::ZERO,
                extract_delay: Duration::ZERO,
                extract_result: Ok(Some(payload)),
                extract_called: Arc::new(AtomicBool::new(false)),
                confidence,
            }
        }

        fn probe_hangs(id: &str) -> Self {
            Self {
                probe_delay: Duration::from_secs(60),
                ..Self::healthy(id, json!({"summary": "never reached"}), 0.9)
            }
        }

        fn probe_refuses(id: &str) -> Self {
            Self {
                probe_ok: false,
                ..Self::healthy(id, json!({"summary": "never reached"}), 0.9)
            }
        }

        fn extract_hangs(id: &str) -> Self {
            Self {
                extract_delay: Duration::from_secs(600),
                ..Self::healthy(id, json!({"summary": "too slow"}), 0.9)
            }
        }

        fn extract_fails(id: &str, failure: ProviderFailure) -> Self {
            Self {
                extract_result: Err(failure),
                ..Self::healthy(id, json!({}), 0.9)
            }
        }

        fn extract_empty(id: &str) -> Self {
            Self {
                extract_result: Ok(None),
                ..Self::healthy(id, json!({}), 0.9)
            }
        }
    }

    #[async_trait]
    impl ExtractionProvider for ScriptedProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn probe_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn extract_timeout(&self) -> Duration {
            Duration::from_secs(90)
        }

        async fn probe(&self) -> bool {
            tokio::time::sleep(self.probe_delay).await;
            self.probe_ok
        }

        async fn extract(
            &self,
            _input: &ExtractionInput,
        ) -> std::result::Result<RawExtraction, ProviderFailure> {
            self.extract_called.store(true, Ordering::SeqCst);
            tokio::time::sleep(self.extract_delay).await;
            match &self.extract_result {
                Err(failure) => Err(failure.clone()),
                Ok(None) => Ok(RawExtraction {
                    // Parses, but has no substance.
                    structured: Some(json!({"skills": []})),
                    body: None,
                    source_text: Some(String::new()),
                    provider: self.id.clone(),
                    confidence_structured: self.confidence,
                    confidence_text: self.confidence,
                }),
                Ok(Some(payload)) => Ok(RawExtraction {
                    structured: Some(payload.clone()),
                    body: None,
                    source_text: Some("document text".to_string()),
                    provider: self.id.clone(),
                    confidence_structured: self.confidence,
                    confidence_text: self.confidence,
                }),
            }
        }
    }

    fn input() -> ExtractionInput {
        ExtractionInput {
            title: "Jane Doe Resume".to_string(),
            file_ref: "uploads/jane.pdf".to_string(),
            file_bytes: None,
            raw_text: Some("Jane Doe, engineer, jane@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn first_healthy_provider_wins() {
        let chain = ExtractionChain::new(vec![
            Arc::new(ScriptedProvider::healthy(
                "local-model",
                json!({"summary": "from local", "contact_info": {"name": "Jane"}}),
                0.8,
            )),
            Arc::new(ScriptedProvider::healthy(
                "remote-service",
                json!({"summary": "from remote"}),
                0.9,
            )),
        ]);

        let outcome = chain.run(&input(), None).await;
        assert_eq!(outcome.canonical.provider_used, "local-model");
        assert_eq!(outcome.canonical.summary, "from local");
        assert!(outcome.attempts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_timeout_skips_extraction_entirely() {
        let hanging = ScriptedProvider::probe_hangs("local-model");
        let called = hanging.extract_called.clone();

        let chain = ExtractionChain::new(vec![
            Arc::new(hanging),
            Arc::new(HeuristicProvider),
            Arc::new(StubProvider),
        ]);

        let outcome = chain.run(&input(), None).await;

        // The expensive path was never invoked.
        assert!(!called.load(Ordering::SeqCst));
        // Fell through to the heuristic parser.
        assert_eq!(outcome.canonical.provider_used, "heuristic");
        assert_eq!(outcome.attempts.len(), 1);
        assert!(matches!(
            outcome.attempts[0].failure,
            ProviderFailure::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn failed_probe_falls_through_without_raising() {
        let refused = ScriptedProvider::probe_refuses("remote-service");
        let called = refused.extract_called.clone();

        let chain = ExtractionChain::new(vec![Arc::new(refused), Arc::new(StubProvider)]);
        let outcome = chain.run(&input(), None).await;

        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(outcome.canonical.provider_used, "stub");
    }

    #[tokio::test(start_paused = true)]
    async fn extraction_timeout_falls_through() {
        let chain = ExtractionChain::new(vec![
            Arc::new(ScriptedProvider::extract_hangs("local-model")),
            Arc::new(StubProvider),
        ]);

        let outcome = chain.run(&input(), None).await;
        assert_eq!(outcome.canonical.provider_used, "stub");
        assert!(matches!(
            outcome.attempts[0].failure,
            ProviderFailure::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn malformed_response_falls_through() {
        let chain = ExtractionChain::new(vec![
            Arc::new(ScriptedProvider::extract_fails(
                "local-model",
                ProviderFailure::Malformed("not json".into()),
            )),
            Arc::new(StubProvider),
        ]);

        let outcome = chain.run(&input(), None).await;
        assert_eq!(outcome.canonical.provider_used, "stub");
    }

    #[tokio::test]
    async fn insubstantial_result_falls_through() {
        let chain = ExtractionChain::new(vec![
            Arc::new(ScriptedProvider::extract_empty("local-model")),
            Arc::new(StubProvider),
        ]);

        let outcome = chain.run(&input(), None).await;
        assert_eq!(outcome.canonical.provider_used, "stub");
        assert!(matches!(outcome.attempts[0].failure, ProviderFailure::Empty));
    }

    #[tokio::test]
    async fn exhausted_chain_yields_minimal_stub() {
        // No stub registered at all — the chain still never raises.
        let chain = ExtractionChain::new(vec![Arc::new(ScriptedProvider::extract_fails(
            "local-model",
            ProviderFailure::Http("boom".into()),
        ))]);

        let outcome = chain.run(&input(), None).await;
        assert_eq!(outcome.canonical.provider_used, "stub");
        assert_eq!(outcome.canonical.confidence, STUB_CONFIDENCE);
        assert!(!outcome.canonical.summary.is_empty());
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn preference_moves_provider_to_front() {
        let chain = ExtractionChain::new(vec![
            Arc::new(ScriptedProvider::healthy(
                "local-model",
                json!({"summary": "local"}),
                0.8,
            )),
            Arc::new(ScriptedProvider::healthy(
                "remote-service",
                json!({"summary": "remote"}),
                0.9,
            )),
        ]);

        let outcome = chain.run(&input(), Some("remote-service")).await;
        assert_eq!(outcome.canonical.provider_used, "remote-service");
    }

    #[tokio::test]
    async fn unknown_preference_keeps_default_order() {
        let chain = ExtractionChain::new(vec![
            Arc::new(ScriptedProvider::healthy(
                "local-model",
                json!({"summary": "local"}),
                0.8,
            )),
            Arc::new(StubProvider),
        ]);

        let outcome = chain.run(&input(), Some("no-such-provider")).await;
        assert_eq!(outcome.canonical.provider_used, "local-model");
    }

    #[tokio::test]
    async fn standard_chain_order() {
        let chain = ExtractionChain::standard(
            LocalModelProvider::new("http://127.0.0.1:1".into(), "m".into()),
            RemoteServiceProvider::new("http://127.0.0.1:1".into()),
        );
        assert_eq!(
            chain.provider_ids(),
            vec!["local-model", "remote-service", "heuristic", "stub"]
        );
    }
}
