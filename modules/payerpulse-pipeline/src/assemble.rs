//! Pipeline boundary: validate one untyped raw document and compose the
//! normalizer, extractor, sentiment scorer and influence scorer into a
//! `TransformedPost`. Pure, no I/O. Fails closed: any missing mandatory
//! field rejects the whole record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use payerpulse_common::{
    rules::SentimentThresholds, PayerPulseError, RawRecord, RuleBook, SentimentLabel,
    TransformedPost,
};

use crate::extract::EntityExtractor;
use crate::influence::InfluenceScorer;
use crate::normalize::Normalizer;
use crate::sentiment::SentimentScorer;

type Result<T> = std::result::Result<T, PayerPulseError>;

pub struct Assembler {
    normalizer: Normalizer,
    extractor: EntityExtractor,
    scorer: Arc<dyn SentimentScorer>,
    influence: InfluenceScorer,
    thresholds: SentimentThresholds,
}

impl Assembler {
    pub fn new(rules: Arc<RuleBook>, scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            normalizer: Normalizer::new(rules.strip_trailing_hashtags),
            extractor: EntityExtractor::new(rules.clone()),
            scorer,
            influence: InfluenceScorer::new(&rules),
            thresholds: rules.thresholds,
        }
    }

    /// Validate and transform one raw record. `batch_started_at` is the
    /// fallback reference instant for relative timestamps when the record
    /// carries no usable capture time.
    pub fn assemble(
        &self,
        raw: &RawRecord,
        batch_started_at: DateTime<Utc>,
    ) -> Result<TransformedPost> {
        let doc = raw
            .doc
            .as_object()
            .ok_or_else(|| malformed("document"))?;

        let platform_post_id = require_str(doc, "post_id")?;
        let author_natural_key = require_str(doc, "author_id")?;
        let raw_content = require_str(doc, "content")?;
        let raw_posted_at = require_str(doc, "posted_at")?;
        let likes = require_count(doc, "likes")?;
        let comments = require_count(doc, "comments")?;
        let reposts = require_count(doc, "reposts")?;

        let author_name =
            opt_str(doc, "author_name").unwrap_or_else(|| author_natural_key.clone());
        let author_title = opt_str(doc, "author_title");
        let author_profile_url = opt_str(doc, "author_profile_url");

        // Relative timestamps resolve against the capture instant, not load
        // time, so replays produce identical posted_at values.
        let captured_at = opt_str(doc, "captured_at")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(batch_started_at);

        let content = self.normalizer.normalize_text(&raw_content);
        if content.is_empty() {
            return Err(malformed("content"));
        }
        let posted_at = self.normalizer.normalize_timestamp(&raw_posted_at, captured_at)?;

        let entities = self.extractor.extract(&content);
        let sentiment_score = self.scorer.score(&content).clamp(-1.0, 1.0);
        let sentiment_label = SentimentLabel::from_score(sentiment_score, &self.thresholds);
        let is_physician = self.influence.is_physician(author_title.as_deref());
        let impact_score = self.influence.impact_score(likes, comments, reposts);

        Ok(TransformedPost {
            platform_post_id,
            author_natural_key,
            author_name,
            author_title,
            author_profile_url,
            is_physician,
            posted_at,
            content,
            sentiment_score,
            sentiment_label,
            likes,
            comments,
            reposts,
            impact_score,
            matched_payers: entities.payers,
            matched_procedures: entities.procedures,
            matched_topics: entities.topics,
        })
    }
}

fn malformed(field: &str) -> PayerPulseError {
    PayerPulseError::MalformedRecord {
        field: field.to_string(),
    }
}

fn require_str(doc: &Map<String, Value>, field: &str) -> Result<String> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(malformed(field)),
    }
}

fn opt_str(doc: &Map<String, Value>, field: &str) -> Option<String> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Engagement counters arrive as numbers or numeric strings depending on the
/// scraper. Negative or non-numeric values reject the record.
fn require_count(doc: &Map<String, Value>, field: &str) -> Result<i64> {
    let value = match doc.get(field) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match value {
        Some(n) if n >= 0 => Ok(n),
        _ => Err(malformed(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::LexiconScorer;
    use crate::testing::{sample_raw, sample_rules};
    use chrono::TimeZone;
    use serde_json::json;

    fn assembler() -> Assembler {
        let rules = Arc::new(sample_rules());
        let scorer = Arc::new(LexiconScorer::new(&rules));
        Assembler::new(rules, scorer)
    }

    fn batch_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn assembles_a_complete_record() {
        let post = assembler().assemble(&sample_raw("p-1"), batch_start()).unwrap();

        assert_eq!(post.platform_post_id, "p-1");
        assert_eq!(post.author_natural_key, "li-772");
        // Trailing hashtags stripped, content otherwise intact
        assert_eq!(post.content, "UHC denied our prior auth again, awful");
        // "2d ago" resolves against captured_at, not the batch start
        assert_eq!(
            post.posted_at,
            Utc.with_ymd_and_hms(2026, 8, 26, 8, 0, 0).unwrap()
        );
        assert_eq!(post.sentiment_label, SentimentLabel::Negative);
        assert_eq!(post.impact_score, 26.0);
        assert!(!post.is_physician);
        assert!(post.matched_payers.contains("UHC"));
        assert!(post.matched_procedures.contains("PRIOR_AUTH"));
        assert!(post.matched_topics.contains("DENIAL"));
    }

    #[test]
    fn missing_content_names_the_field() {
        let mut raw = sample_raw("p-2");
        raw.doc.as_object_mut().unwrap().remove("content");
        let err = assembler().assemble(&raw, batch_start()).unwrap_err();
        assert!(
            matches!(err, PayerPulseError::MalformedRecord { ref field } if field.as_str() == "content")
        );
    }

    #[test]
    fn missing_post_id_is_rejected() {
        let mut raw = sample_raw("p-3");
        raw.doc.as_object_mut().unwrap().remove("post_id");
        let err = assembler().assemble(&raw, batch_start()).unwrap_err();
        assert!(
            matches!(err, PayerPulseError::MalformedRecord { ref field } if field.as_str() == "post_id")
        );
    }

    #[test]
    fn negative_counter_is_rejected() {
        let mut raw = sample_raw("p-4");
        raw.doc.as_object_mut().unwrap().insert("likes".into(), json!(-3));
        let err = assembler().assemble(&raw, batch_start()).unwrap_err();
        assert!(matches!(err, PayerPulseError::MalformedRecord { ref field } if field.as_str() == "likes"));
    }

    #[test]
    fn numeric_string_counters_are_accepted() {
        let mut raw = sample_raw("p-5");
        let doc = raw.doc.as_object_mut().unwrap();
        doc.insert("likes".into(), json!("10"));
        doc.insert("comments".into(), json!("5"));
        let post = assembler().assemble(&raw, batch_start()).unwrap();
        assert_eq!(post.likes, 10);
        assert_eq!(post.impact_score, 26.0);
    }

    #[test]
    fn unparseable_timestamp_is_a_normalization_error() {
        let mut raw = sample_raw("p-6");
        raw.doc
            .as_object_mut()
            .unwrap()
            .insert("posted_at".into(), json!("around lunchtime"));
        let err = assembler().assemble(&raw, batch_start()).unwrap_err();
        assert!(matches!(err, PayerPulseError::Normalization(_)));
    }

    #[test]
    fn physician_author_title_sets_flag() {
        let mut raw = sample_raw("p-7");
        raw.doc
            .as_object_mut()
            .unwrap()
            .insert("author_title".into(), json!("Cardiologist, M.D."));
        let post = assembler().assemble(&raw, batch_start()).unwrap();
        assert!(post.is_physician);
    }

    #[test]
    fn non_object_document_is_malformed() {
        let raw = RawRecord {
            source: "x.ndjson".into(),
            line: 9,
            doc: json!(["not", "an", "object"]),
        };
        let err = assembler().assemble(&raw, batch_start()).unwrap_err();
        assert!(matches!(err, PayerPulseError::MalformedRecord { .. }));
    }
}
