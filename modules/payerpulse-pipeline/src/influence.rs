//! Influence scoring: weighted engagement plus the physician-authorship flag.

use regex::Regex;

use payerpulse_common::rules::InfluenceWeights;
use payerpulse_common::RuleBook;

pub struct InfluenceScorer {
    weights: InfluenceWeights,
    physician: Option<Regex>,
}

impl InfluenceScorer {
    pub fn new(rules: &RuleBook) -> Self {
        Self {
            weights: rules.weights,
            physician: rules.physician_pattern.clone(),
        }
    }

    /// Weighted engagement sum. Counters are validated non-negative upstream.
    pub fn impact_score(&self, likes: i64, comments: i64, reposts: i64) -> f64 {
        likes as f64 * self.weights.likes
            + comments as f64 * self.weights.comments
            + reposts as f64 * self.weights.reposts
    }

    /// True iff the author title matches a configured professional
    /// designation. No title, or no configured patterns, means false.
    pub fn is_physician(&self, title: Option<&str>) -> bool {
        match (&self.physician, title) {
            (Some(pattern), Some(title)) => pattern.is_match(title),
            _ => false,
        }
    }
}
