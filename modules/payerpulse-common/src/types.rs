use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::SentimentThresholds;

// --- Raw side ---

/// One as-captured post document from the raw store, plus provenance.
/// The document itself is untyped until the assembler validates it.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Raw store file the record came from.
    pub source: String,
    /// 1-based line number within the source file.
    pub line: u64,
    pub doc: serde_json::Value,
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Payer,
    Procedure,
    Topic,
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityCategory::Payer => write!(f, "payer"),
            EntityCategory::Procedure => write!(f, "procedure"),
            EntityCategory::Topic => write!(f, "topic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Derive the categorical label from a score. Pure and independent of
    /// whichever scoring algorithm produced the score. Boundary values are
    /// neutral (strict inequality on both thresholds).
    pub fn from_score(score: f32, thresholds: &SentimentThresholds) -> Self {
        if score > thresholds.positive {
            SentimentLabel::Positive
        } else if score < thresholds.negative {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Transformed side ---

/// Validated, fully scored record for one post. `platform_post_id` is the
/// idempotency anchor for everything downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedPost {
    pub platform_post_id: String,
    pub author_natural_key: String,
    pub author_name: String,
    pub author_title: Option<String>,
    pub author_profile_url: Option<String>,
    pub is_physician: bool,
    pub posted_at: DateTime<Utc>,
    pub content: String,
    pub sentiment_score: f32,
    pub sentiment_label: SentimentLabel,
    pub likes: i64,
    pub comments: i64,
    pub reposts: i64,
    pub impact_score: f64,
    pub matched_payers: BTreeSet<String>,
    pub matched_procedures: BTreeSet<String>,
    pub matched_topics: BTreeSet<String>,
}

impl TransformedPost {
    pub fn matched(&self, category: EntityCategory) -> &BTreeSet<String> {
        match category {
            EntityCategory::Payer => &self.matched_payers,
            EntityCategory::Procedure => &self.matched_procedures,
            EntityCategory::Topic => &self.matched_topics,
        }
    }
}
