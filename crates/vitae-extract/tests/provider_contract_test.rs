//! HTTP contract tests for the probed providers, against a mock
//! server.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitae_core::JobDescription;
use vitae_extract::{
    EnhancementProvider, ExtractionInput, ExtractionProvider, LocalModelProvider,
    ProviderFailure, RemoteEnhancer, RemoteServiceProvider,
};

fn sample_input() -> ExtractionInput {
    ExtractionInput {
        title: "Jane Doe Resume".to_string(),
        file_ref: "uploads/jane.pdf".to_string(),
        file_bytes: Some(b"%PDF-1.4 fake".to_vec()),
        raw_text: Some("Jane Doe, Rust engineer, jane@example.com".to_string()),
    }
}

fn sample_job() -> JobDescription {
    JobDescription {
        id: uuid::Uuid::new_v4(),
        user_id: None,
        title: "Backend Engineer".into(),
        company: None,
        content: "Rust and PostgreSQL".into(),
        derived_keywords: vec!["rust".into(), "postgresql".into()],
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Remote service: /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remote_probe_healthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "service": "ai-extraction-service",
            "mode": "ollama-focused"
        })))
        .mount(&server)
        .await;

    let provider = RemoteServiceProvider::new(server.uri());
    assert!(provider.probe().await);
}

#[tokio::test]
async fn remote_probe_unhealthy_status_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "degraded"})))
        .mount(&server)
        .await;

    let provider = RemoteServiceProvider::new(server.uri());
    assert!(!provider.probe().await);
}

#[tokio::test]
async fn remote_probe_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = RemoteServiceProvider::new(server.uri());
    assert!(!provider.probe().await);
}

#[tokio::test]
async fn remote_probe_unreachable() {
    // Nothing listening here.
    let provider = RemoteServiceProvider::new("http://127.0.0.1:9".to_string());
    assert!(!provider.probe().await);
}

// ---------------------------------------------------------------------------
// Remote service: /extract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remote_extract_success_contract() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "structured_data": {
                "contact_info": {
                    "name": "Jane Doe",
                    "email": "<jane@example.com>",
                    "phone": "555-0100",
                    "location": "Lisbon"
                },
                "summary": "Senior engineer",
                "skills": ["Languages: Rust, Python"],
                "experience": [],
                "education": []
            },
            "provider_used": "ollama-llama3.2",
            "confidence_score": 0.9,
            "original_text": "Jane Doe. Senior engineer."
        })))
        .mount(&server)
        .await;

    let provider = RemoteServiceProvider::new(server.uri());
    let raw = provider.extract(&sample_input()).await.unwrap();

    let canonical = vitae_extract::canonicalize(&raw);
    assert_eq!(canonical.contact.name.as_deref(), Some("Jane Doe"));
    // Email sanitized through the normalizer.
    assert_eq!(canonical.contact.email.as_deref(), Some("jane@example.com"));
    assert_eq!(canonical.skills, vec!["Rust", "Python"]);
    assert_eq!(canonical.provider_used, "ollama-llama3.2");
    assert_eq!(canonical.confidence, 0.9);
    assert_eq!(canonical.raw_text, "Jane Doe. Senior engineer.");
}

#[tokio::test]
async fn remote_extract_failure_contract() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "Structured extraction failed",
            "provider_tried": "ollama"
        })))
        .mount(&server)
        .await;

    let provider = RemoteServiceProvider::new(server.uri());
    let result = provider.extract(&sample_input()).await;
    match result {
        Err(ProviderFailure::Http(msg)) => assert!(msg.contains("Structured extraction failed")),
        other => panic!("expected Http failure, got {:?}", other),
    }
}

#[tokio::test]
async fn remote_extract_missing_payload_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .mount(&server)
        .await;

    let provider = RemoteServiceProvider::new(server.uri());
    assert!(matches!(
        provider.extract(&sample_input()).await,
        Err(ProviderFailure::Malformed(_))
    ));
}

// ---------------------------------------------------------------------------
// Local model: /api/tags and /api/generate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_probe_requires_installed_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3.2:3b"}]
        })))
        .mount(&server)
        .await;

    let provider = LocalModelProvider::new(server.uri(), "llama3.2:3b".to_string());
    assert!(provider.probe().await);
}

#[tokio::test]
async fn local_probe_empty_model_list_is_unhealthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&server)
        .await;

    let provider = LocalModelProvider::new(server.uri(), "llama3.2:3b".to_string());
    assert!(!provider.probe().await);
}

#[tokio::test]
async fn local_extract_fenced_json_answer() {
    let server = MockServer::start().await;
    let answer = "Here you go:\n```json\n{\"contact_info\": {\"name\": \"Jane Doe\", \"email\": \"jane@example.com\"}, \"summary\": \"Engineer\", \"skills\": [\"Rust\"]}\n```";
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2:3b",
            "response": answer,
            "done": true
        })))
        .mount(&server)
        .await;

    let provider = LocalModelProvider::new(server.uri(), "llama3.2:3b".to_string());
    let raw = provider.extract(&sample_input()).await.unwrap();
    let canonical = vitae_extract::canonicalize(&raw);

    assert_eq!(canonical.contact.name.as_deref(), Some("Jane Doe"));
    assert_eq!(canonical.skills, vec!["Rust"]);
    // Structured tier: the fenced block parsed.
    assert_eq!(canonical.confidence, 0.8);
}

#[tokio::test]
async fn local_extract_free_text_answer_downgrades_confidence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "The candidate is Jane, reachable at jane@example.com, skilled in Rust."
        })))
        .mount(&server)
        .await;

    let provider = LocalModelProvider::new(server.uri(), "llama3.2:3b".to_string());
    let raw = provider.extract(&sample_input()).await.unwrap();
    let canonical = vitae_extract::canonicalize(&raw);

    assert_eq!(canonical.contact.email.as_deref(), Some("jane@example.com"));
    // Text tier for a free-text answer.
    assert_eq!(canonical.confidence, 0.6);
}

#[tokio::test]
async fn local_extract_empty_answer_is_empty_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "  "})))
        .mount(&server)
        .await;

    let provider = LocalModelProvider::new(server.uri(), "llama3.2:3b".to_string());
    assert!(matches!(
        provider.extract(&sample_input()).await,
        Err(ProviderFailure::Empty)
    ));
}

// ---------------------------------------------------------------------------
// Remote enhancer: /enhance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enhance_success_contract() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enhance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enhanced_result": {
                "match_score": 64.0,
                "suggestions": ["Add quantifiable achievements with concrete numbers"],
                "enhanced_skills": ["Rust", "PostgreSQL"]
            },
            "provider_used": "ollama-llama3.2"
        })))
        .mount(&server)
        .await;

    let enhancer = RemoteEnhancer::new(server.uri());
    let resume = vitae_core::CanonicalResume::placeholder("Jane", "local-model", 0.8);
    let result = enhancer.enhance(&resume, &sample_job()).await.unwrap();

    assert_eq!(result.match_score, 64.0);
    assert_eq!(result.provider_used, "ollama-llama3.2");
}

#[tokio::test]
async fn enhance_degraded_skipped_contract() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enhance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Enhancement timeout",
            "skipped": true
        })))
        .mount(&server)
        .await;

    let enhancer = RemoteEnhancer::new(server.uri());
    let resume = vitae_core::CanonicalResume::placeholder("Jane", "local-model", 0.8);
    let result = enhancer.enhance(&resume, &sample_job()).await;

    match result {
        Err(ProviderFailure::Unavailable(msg)) => assert!(msg.contains("Enhancement timeout")),
        other => panic!("expected Unavailable, got {:?}", other),
    }
}
