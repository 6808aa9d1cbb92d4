// src/signal.rs
//! Candidate signal record and assembly. One candidate per message today;
//! the pipeline persists candidates through a collection loop so per-URL
//! extraction can slot in later without touching storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    News,
    Academic,
    Patent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSignal {
    pub title: String,
    pub description: String,
    pub source_label: String,
    pub canonical_url: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub is_user_submitted: bool,
    pub sentiment: Sentiment,
    pub impact_level: ImpactLevel,
    /// Integer in [0, 100]; written by the scoring stage just before
    /// persistence, zero until then.
    pub relevance_score: u8,
}

/// Map an arbitrary upstream "signal type" string onto the three persisted
/// categories. Unmapped values are news.
pub fn map_source_type(raw: &str) -> SignalType {
    match raw.trim().to_ascii_lowercase().as_str() {
        "academic" | "paper" | "research" | "journal" | "preprint" => SignalType::Academic,
        "patent" | "filing" | "ip" => SignalType::Patent,
        _ => SignalType::News,
    }
}

/// Lowercased alphanumeric runs joined by single dashes, capped at 60 chars.
/// Empty subjects slug to "message".
pub fn slugify(subject: &str) -> String {
    let mut out = String::with_capacity(subject.len());
    let mut prev_dash = true; // suppress a leading dash
    for ch in subject.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
        if out.len() >= 60 {
            break;
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "message".to_string()
    } else {
        out
    }
}

/// Synthetic canonical URL for messages that carried no usable web URL.
/// Slug-based so distinct subjects stay apart from real URLs and each other.
pub fn placeholder_url(subject: &str) -> String {
    format!("email://{}", slugify(subject))
}

/// Build the one candidate signal: subject becomes the title, the gate
/// output the description, the sender the source label, and the first
/// extracted URL (or the placeholder) the canonical URL. Type, sentiment,
/// and impact carry fixed defaults.
pub fn assemble(
    subject: &str,
    sender: &str,
    description: String,
    urls: &[String],
) -> CandidateSignal {
    let canonical_url = urls
        .first()
        .cloned()
        .unwrap_or_else(|| placeholder_url(subject));
    CandidateSignal {
        title: subject.to_string(),
        description,
        source_label: sender.to_string(),
        canonical_url,
        timestamp: Utc::now(),
        signal_type: map_source_type("user_submission"),
        is_user_submitted: true,
        sentiment: Sentiment::Neutral,
        impact_level: ImpactLevel::Medium,
        relevance_score: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_lowercased_and_dashed() {
        assert_eq!(slugify("Fwd: Q3 Market Report!"), "fwd-q3-market-report");
    }

    #[test]
    fn empty_subject_slug_falls_back() {
        assert_eq!(slugify("???"), "message");
        assert_eq!(placeholder_url(""), "email://message");
    }

    #[test]
    fn slug_is_capped() {
        let long = "word ".repeat(40);
        assert!(slugify(&long).len() <= 60);
    }

    #[test]
    fn source_type_mapping_defaults_to_news() {
        assert_eq!(map_source_type("research"), SignalType::Academic);
        assert_eq!(map_source_type("Patent"), SignalType::Patent);
        assert_eq!(map_source_type("user_submission"), SignalType::News);
        assert_eq!(map_source_type(""), SignalType::News);
    }

    #[test]
    fn assembled_signal_carries_defaults() {
        let sig = assemble("Subject", "alice@example.com", "desc".into(), &[]);
        assert_eq!(sig.canonical_url, "email://subject");
        assert!(sig.is_user_submitted);
        assert_eq!(sig.sentiment, Sentiment::Neutral);
        assert_eq!(sig.impact_level, ImpactLevel::Medium);
        assert_eq!(sig.signal_type, SignalType::News);
    }

    #[test]
    fn first_url_wins_as_canonical() {
        let urls = vec![
            "https://a.example/1".to_string(),
            "https://b.example/2".to_string(),
        ];
        let sig = assemble("Subject", "a@b.c", "desc".into(), &urls);
        assert_eq!(sig.canonical_url, "https://a.example/1");
    }
}
