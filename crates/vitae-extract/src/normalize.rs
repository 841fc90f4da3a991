//! Normalization of heterogeneous provider output.
//!
//! Provider responses arrive as well-formed JSON, a free-text answer,
//! or a JSON object buried in a fenced text block. Everything is
//! coerced into one [`CanonicalResume`] immediately at the chain
//! boundary; downstream code never branches on provider shapes.
//!
//! Parsing order: direct structured parse → embedded fenced/braced
//! block → heuristic field extraction over raw text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

use vitae_core::{CanonicalResume, ContactInfo, EducationEntry, ExperienceEntry};

use crate::heuristic;
use crate::provider::RawExtraction;

static FENCED_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced json regex")
});

static VALID_EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email regex")
});

/// Sanitize a raw email value: strip characters outside `[\w@.-]` and
/// leading non-alphanumerics, then validate. Invalid results are
/// absent, never garbage.
pub fn sanitize_email(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());

    if VALID_EMAIL_RE.is_match(cleaned) {
        Some(cleaned.to_string())
    } else {
        None
    }
}

/// Split composite skill entries into individual skills.
///
/// `"Languages: Rust, Python"` becomes `["Rust", "Python"]`; plain
/// entries pass through trimmed. Non-string scalars are stringified.
pub fn split_skills(values: &[JsonValue]) -> Vec<String> {
    let mut skills = Vec::new();
    for value in values {
        match value {
            JsonValue::String(s) => {
                if let Some((_category, items)) = s.split_once(':') {
                    skills.extend(
                        items
                            .split(',')
                            .map(str::trim)
                            .filter(|item| !item.is_empty())
                            .map(String::from),
                    );
                } else {
                    let trimmed = s.trim();
                    if !trimmed.is_empty() {
                        skills.push(trimmed.to_string());
                    }
                }
            }
            JsonValue::Null => {}
            other => skills.push(other.to_string().trim_matches('"').to_string()),
        }
    }
    skills
}

/// Locate a structured payload inside a free-text answer: a fenced
/// ```` ```json ```` block, the whole trimmed body, or the outermost
/// braced region.
pub fn find_embedded_json(text: &str) -> Option<JsonValue> {
    if let Some(caps) = FENCED_JSON_RE.captures(text) {
        if let Ok(value) = serde_json::from_str::<JsonValue>(&caps[1]) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    // Outermost braced region, for prose-wrapped answers.
    let (start, end) = (text.find('{')?, text.rfind('}')?);
    if start < end {
        if let Ok(value) = serde_json::from_str::<JsonValue>(&text[start..=end]) {
            if value.is_object() {
                return Some(value);
            }
        }
    }
    None
}

/// Unwrap provider envelope keys until the payload itself is reached.
fn unwrap_envelope(value: &JsonValue) -> &JsonValue {
    let mut current = value;
    for key in ["structured_data", "data", "enhanced_resume"] {
        if let Some(inner) = current.get(key) {
            if inner.is_object() {
                current = inner;
            }
        }
    }
    current
}

fn str_field(value: &JsonValue, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(*key).and_then(JsonValue::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn array_field<'v>(value: &'v JsonValue, key: &str) -> &'v [JsonValue] {
    value
        .get(key)
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Coerce one provider response into the canonical schema.
///
/// The contact name is left absent when no provider recovered one; the
/// record store falls back to the upload title at persist time.
pub fn canonicalize(raw: &RawExtraction) -> CanonicalResume {
    // 1. A structured payload the provider already returned, or one
    //    recoverable from the free-text body.
    let structured = raw
        .structured
        .clone()
        .or_else(|| raw.body.as_deref().and_then(find_embedded_json));

    let raw_text = raw
        .source_text
        .clone()
        .or_else(|| raw.body.clone())
        .unwrap_or_default();

    let mut canonical = match structured {
        Some(payload) => from_structured(unwrap_envelope(&payload), raw, &raw_text),
        None => from_text(raw, &raw_text),
    };

    canonical.confidence = canonical.confidence.clamp(0.0, 1.0);
    canonical
}

fn from_structured(payload: &JsonValue, raw: &RawExtraction, raw_text: &str) -> CanonicalResume {
    // Some backends hide the real answer inside an `ai_response`
    // free-text field; recover and prefer it when it parses.
    if let Some(inner) = payload
        .get("ai_response")
        .and_then(JsonValue::as_str)
        .and_then(find_embedded_json)
    {
        let merged = RawExtraction {
            structured: Some(inner),
            body: None,
            ..raw.clone()
        };
        return canonicalize_inner_structured(&merged, raw_text);
    }
    canonicalize_inner_structured(
        &RawExtraction {
            structured: Some(payload.clone()),
            ..raw.clone()
        },
        raw_text,
    )
}

fn canonicalize_inner_structured(raw: &RawExtraction, raw_text: &str) -> CanonicalResume {
    let payload = raw.structured.as_ref().expect("structured payload");

    let contact_obj = payload
        .get("contact_info")
        .or_else(|| payload.get("personal_info"))
        .cloned()
        .unwrap_or(JsonValue::Null);

    let contact = ContactInfo {
        name: str_field(&contact_obj, &["name"]),
        email: str_field(&contact_obj, &["email"])
            .as_deref()
            .and_then(sanitize_email),
        phone: str_field(&contact_obj, &["phone"]),
        location: str_field(&contact_obj, &["location"]),
    };

    let skills = split_skills(array_field(payload, "skills"));

    let experience: Vec<ExperienceEntry> = array_field(payload, "experience")
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();

    let education: Vec<EducationEntry> = array_field(payload, "education")
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();

    let summary = str_field(payload, &["summary"])
        .unwrap_or_else(|| "Professional summary not extracted".to_string());

    let resolved_text = str_field(payload, &["raw_text", "original_text", "text"])
        .unwrap_or_else(|| raw_text.to_string());

    // Provider attribution and confidence may be self-reported in the
    // payload (sub-provider granularity); fall back to chain tiers.
    let provider = str_field(payload, &["provider_used", "ai_provider"])
        .unwrap_or_else(|| raw.provider.clone());
    let confidence = payload
        .get("confidence_score")
        .and_then(JsonValue::as_f64)
        .map(|c| c as f32)
        .filter(|c| (0.0..=1.0).contains(c))
        .unwrap_or(raw.confidence_structured);

    CanonicalResume {
        contact,
        summary,
        skills,
        experience,
        education,
        raw_text: resolved_text,
        provider_used: provider,
        confidence,
    }
}

fn from_text(raw: &RawExtraction, raw_text: &str) -> CanonicalResume {
    let fields = heuristic::parse_text(raw_text);

    CanonicalResume {
        contact: ContactInfo {
            email: fields.contact.email.as_deref().and_then(sanitize_email),
            ..fields.contact
        },
        summary: if fields.summary.trim().is_empty() {
            "Professional summary not extracted".to_string()
        } else {
            fields.summary
        },
        skills: fields.skills,
        experience: fields.experience,
        education: fields.education,
        raw_text: raw_text.to_string(),
        provider_used: raw.provider.clone(),
        confidence: raw.confidence_text,
    }
}
