//! Rule-based sentiment scoring. The scoring algorithm sits behind
//! `SentimentScorer` so it can be swapped without touching callers or the
//! label derivation (which lives in payerpulse-common, keyed on thresholds).

use std::collections::HashMap;

use payerpulse_common::RuleBook;

/// The single scoring capability: normalized text in, score in [-1, 1] out.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f32;
}

/// Tokens that flip the valence of a lexicon hit within the lookback window.
const NEGATIONS: [&str; 10] = [
    "not", "no", "never", "don't", "doesn't", "didn't", "can't", "won't", "isn't", "wasn't",
];
const NEGATION_WINDOW: usize = 3;

/// Valence-lexicon scorer: averages the (negation-adjusted) valences of
/// lexicon hits. No hits scores 0.
pub struct LexiconScorer {
    lexicon: HashMap<String, f32>,
}

impl LexiconScorer {
    pub fn new(rules: &RuleBook) -> Self {
        Self {
            lexicon: rules.lexicon.clone(),
        }
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> f32 {
        let tokens: Vec<String> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        let mut sum = 0.0f32;
        let mut hits = 0u32;
        for (i, token) in tokens.iter().enumerate() {
            let Some(&valence) = self.lexicon.get(token.as_str()) else {
                continue;
            };
            let negated = tokens[i.saturating_sub(NEGATION_WINDOW)..i]
                .iter()
                .any(|t| NEGATIONS.contains(&t.as_str()));
            sum += if negated { -valence } else { valence };
            hits += 1;
        }

        if hits == 0 {
            0.0
        } else {
            (sum / hits as f32).clamp(-1.0, 1.0)
        }
    }
}
