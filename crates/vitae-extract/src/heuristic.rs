//! Deterministic heuristic parser.
//!
//! Regex and keyword pass over already-available text. No network, no
//! probe, near-instant, low confidence. Also backs the normalizer's
//! last-resort field recovery for free-text provider answers.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use vitae_core::defaults::HEURISTIC_CONFIDENCE;
use vitae_core::{ContactInfo, EducationEntry, ExperienceEntry};

use crate::provider::{ExtractionInput, ExtractionProvider, ProviderFailure, RawExtraction};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").expect("phone regex")
});

/// Skills matched case-insensitively against the document text.
const TECH_SKILLS: &[&str] = &[
    "Python",
    "Java",
    "JavaScript",
    "TypeScript",
    "Ruby",
    "Rust",
    "Go",
    "React",
    "Node.js",
    "SQL",
    "PostgreSQL",
    "HTML",
    "CSS",
    "Git",
    "AWS",
    "Azure",
    "Docker",
    "Kubernetes",
    "Machine Learning",
    "Data Science",
    "Project Management",
];

const EDUCATION_KEYWORDS: &[&str] = &["university", "college", "bachelor", "master", "phd", "degree"];

const EXPERIENCE_KEYWORDS: &[&str] = &["manager", "developer", "engineer", "analyst", "director", "lead"];

/// How much of the document becomes the fallback summary.
const SUMMARY_LEN: usize = 300;

/// Fields recovered from free text.
#[derive(Debug, Default)]
pub struct HeuristicFields {
    pub contact: ContactInfo,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub summary: String,
}

/// First email in the text, if any.
pub fn find_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// First phone number in the text, if any.
pub fn find_phone(text: &str) -> Option<String> {
    PHONE_RE.find(text).map(|m| m.as_str().to_string())
}

/// Known skills present in the text, in catalog order.
pub fn find_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TECH_SKILLS
        .iter()
        .filter(|skill| lower.contains(&skill.to_lowercase()))
        .map(|s| s.to_string())
        .collect()
}

fn find_education(text: &str) -> Vec<EducationEntry> {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            EDUCATION_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .take(3)
        .map(|line| EducationEntry {
            degree: String::new(),
            institution: line.trim().to_string(),
            year: String::new(),
        })
        .collect()
}

fn find_experience(text: &str) -> Vec<ExperienceEntry> {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            EXPERIENCE_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .take(5)
        .map(|line| ExperienceEntry {
            company: String::new(),
            title: line.trim().to_string(),
            duration: String::new(),
            description: line.trim().to_string(),
        })
        .collect()
}

/// Run the full heuristic pass over document text.
pub fn parse_text(text: &str) -> HeuristicFields {
    let summary = if text.len() > SUMMARY_LEN {
        // Cut on a char boundary.
        let mut end = SUMMARY_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    } else {
        text.to_string()
    };

    HeuristicFields {
        contact: ContactInfo {
            name: None,
            email: find_email(text),
            phone: find_phone(text),
            location: None,
        },
        skills: find_skills(text),
        experience: find_experience(text),
        education: find_education(text),
        summary,
    }
}

/// The heuristic parser as a chain provider.
pub struct HeuristicProvider;

#[async_trait]
impl ExtractionProvider for HeuristicProvider {
    fn id(&self) -> &str {
        "heuristic"
    }

    fn requires_probe(&self) -> bool {
        false
    }

    fn extract_timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn probe(&self) -> bool {
        true
    }

    async fn extract(
        &self,
        input: &ExtractionInput,
    ) -> std::result::Result<RawExtraction, ProviderFailure> {
        let text = input.text().ok_or(ProviderFailure::Empty)?;
        let fields = parse_text(text);

        Ok(RawExtraction {
            structured: Some(json!({
                "contact_info": {
                    "name": fields.contact.name,
                    "email": fields.contact.email,
                    "phone": fields.contact.phone,
                    "location": fields.contact.location,
                },
                "summary": fields.summary,
                "skills": fields.skills,
                "experience": fields.experience,
                "education": fields.education,
            })),
            body: None,
            source_text: Some(text.to_string()),
            provider: self.id().to_string(),
            confidence_structured: HEURISTIC_CONFIDENCE,
            confidence_text: HEURISTIC_CONFIDENCE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Jane Doe\njane.doe@example.com | (555) 123-4567\n\
        Senior Software Engineer at Acme\n\
        Skills: Rust, PostgreSQL, Docker\n\
        Bachelor of Science, State University, 2015\n";

    #[test]
    fn finds_email() {
        assert_eq!(find_email(SAMPLE), Some("jane.doe@example.com".to_string()));
        assert_eq!(find_email("no contact here"), None);
    }

    #[test]
    fn finds_phone() {
        assert_eq!(find_phone(SAMPLE), Some("(555) 123-4567".to_string()));
        assert_eq!(find_phone("call me maybe"), None);
    }

    #[test]
    fn finds_known_skills_case_insensitive() {
        let skills = find_skills("experience with RUST, postgresql and docker");
        assert_eq!(skills, vec!["Rust", "PostgreSQL", "Docker"]);
    }

    #[test]
    fn education_lines_capped_at_three() {
        let text = "University A\nUniversity B\nCollege C\nUniversity D\n";
        assert_eq!(find_education(text).len(), 3);
    }

    #[test]
    fn experience_lines_capped_at_five() {
        let text = "Engineer 1\nEngineer 2\nManager 3\nAnalyst 4\nDirector 5\nLead 6\n";
        assert_eq!(find_experience(text).len(), 5);
    }

    #[test]
    fn parse_text_collects_all_fields() {
        let fields = parse_text(SAMPLE);
        assert!(fields.contact.email.is_some());
        assert!(fields.contact.phone.is_some());
        assert!(!fields.skills.is_empty());
        assert!(!fields.education.is_empty());
        assert!(!fields.experience.is_empty());
        assert!(!fields.summary.is_empty());
    }

    #[test]
    fn long_text_gets_truncated_summary() {
        let text = "x".repeat(1000);
        let fields = parse_text(&text);
        assert!(fields.summary.ends_with("..."));
        assert!(fields.summary.len() <= SUMMARY_LEN + 3);
    }

    #[tokio::test]
    async fn provider_requires_text() {
        let provider = HeuristicProvider;
        let result = provider.extract(&ExtractionInput::default()).await;
        assert!(matches!(result, Err(ProviderFailure::Empty)));
    }

    #[tokio::test]
    async fn provider_extracts_structured_payload() {
        let provider = HeuristicProvider;
        let input = ExtractionInput {
            raw_text: Some(SAMPLE.to_string()),
            ..Default::default()
        };
        let raw = provider.extract(&input).await.unwrap();
        assert_eq!(raw.provider, "heuristic");
        assert!(raw.structured.is_some());
        assert_eq!(raw.confidence_structured, HEURISTIC_CONFIDENCE);
    }
}
