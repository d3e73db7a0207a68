//! Rule book: the externally supplied, versioned rule data the pipeline runs
//! on — entity dictionaries, sentiment thresholds and lexicon, influence
//! weights, physician title patterns. Loaded once at startup, validated
//! fail-fast, immutable afterwards. Nothing in here is hard-coded into the
//! pipeline stages.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::error::PayerPulseError;
use crate::types::EntityCategory;

type Result<T> = std::result::Result<T, PayerPulseError>;

// --- On-disk shape (JSON) ---

#[derive(Debug, Deserialize)]
struct RuleFile {
    version: u32,
    #[serde(default)]
    payers: BTreeMap<String, DictEntry>,
    #[serde(default)]
    procedures: BTreeMap<String, DictEntry>,
    #[serde(default)]
    topics: BTreeMap<String, DictEntry>,
    sentiment: SentimentRules,
    #[serde(default)]
    influence: InfluenceWeights,
    #[serde(default)]
    physician_titles: Vec<String>,
    #[serde(default = "default_strip_hashtags")]
    strip_trailing_hashtags: bool,
}

fn default_strip_hashtags() -> bool {
    true
}

/// One dictionary entry: display name plus the surface forms that map to the code.
#[derive(Debug, Deserialize)]
struct DictEntry {
    name: String,
    terms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SentimentRules {
    #[serde(default)]
    thresholds: SentimentThresholds,
    lexicon: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SentimentThresholds {
    pub positive: f32,
    pub negative: f32,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            positive: 0.15,
            negative: -0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InfluenceWeights {
    pub likes: f64,
    pub comments: f64,
    pub reposts: f64,
}

impl Default for InfluenceWeights {
    fn default() -> Self {
        Self {
            likes: 1.0,
            comments: 2.0,
            reposts: 3.0,
        }
    }
}

// --- Compiled form ---

/// One entity code with its compiled surface-form matcher.
#[derive(Debug, Clone)]
pub struct EntityRule {
    pub code: String,
    pub display_name: String,
    pub pattern: Regex,
}

/// Compiled, immutable rule data. Built once per run from the rule file.
#[derive(Debug, Clone)]
pub struct RuleBook {
    pub version: u32,
    payers: Vec<EntityRule>,
    procedures: Vec<EntityRule>,
    topics: Vec<EntityRule>,
    pub thresholds: SentimentThresholds,
    pub weights: InfluenceWeights,
    pub lexicon: HashMap<String, f32>,
    /// None when no titles are configured — then nobody is a physician.
    pub physician_pattern: Option<Regex>,
    pub strip_trailing_hashtags: bool,
}

impl RuleBook {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PayerPulseError::Config(format!("cannot read rule file {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: RuleFile = serde_json::from_str(raw)
            .map_err(|e| PayerPulseError::Config(format!("invalid rule file: {e}")))?;

        let thresholds = file.sentiment.thresholds;
        if !(-1.0..=1.0).contains(&thresholds.positive)
            || !(-1.0..=1.0).contains(&thresholds.negative)
            || thresholds.negative >= thresholds.positive
        {
            return Err(PayerPulseError::Config(format!(
                "sentiment thresholds must satisfy -1 <= negative < positive <= 1, got negative={} positive={}",
                thresholds.negative, thresholds.positive
            )));
        }

        if file.sentiment.lexicon.is_empty() {
            return Err(PayerPulseError::Config(
                "sentiment lexicon is empty".into(),
            ));
        }
        for (word, valence) in &file.sentiment.lexicon {
            if !(-1.0..=1.0).contains(valence) {
                return Err(PayerPulseError::Config(format!(
                    "lexicon valence for `{word}` must be in [-1, 1], got {valence}"
                )));
            }
        }
        let lexicon: HashMap<String, f32> = file
            .sentiment
            .lexicon
            .into_iter()
            .map(|(w, v)| (w.to_lowercase(), v))
            .collect();

        let weights = file.influence;
        if weights.likes < 0.0 || weights.comments < 0.0 || weights.reposts < 0.0 {
            return Err(PayerPulseError::Config(
                "influence weights must be non-negative".into(),
            ));
        }

        let physician_pattern = compile_physician_pattern(&file.physician_titles)?;

        Ok(Self {
            version: file.version,
            payers: compile_dictionary(EntityCategory::Payer, &file.payers)?,
            procedures: compile_dictionary(EntityCategory::Procedure, &file.procedures)?,
            topics: compile_dictionary(EntityCategory::Topic, &file.topics)?,
            thresholds,
            weights,
            lexicon,
            physician_pattern,
            strip_trailing_hashtags: file.strip_trailing_hashtags,
        })
    }

    pub fn entity_rules(&self, category: EntityCategory) -> &[EntityRule] {
        match category {
            EntityCategory::Payer => &self.payers,
            EntityCategory::Procedure => &self.procedures,
            EntityCategory::Topic => &self.topics,
        }
    }
}

/// Compile one category dictionary into code → word-boundary alternation rules.
/// Surface forms are literals, not regexes — they get escaped.
fn compile_dictionary(
    category: EntityCategory,
    entries: &BTreeMap<String, DictEntry>,
) -> Result<Vec<EntityRule>> {
    let mut rules = Vec::with_capacity(entries.len());
    for (code, entry) in entries {
        if code.trim().is_empty() {
            return Err(PayerPulseError::Config(format!(
                "{category} dictionary has an empty code"
            )));
        }
        if entry.name.trim().is_empty() {
            return Err(PayerPulseError::Config(format!(
                "{category} code `{code}` has an empty display name"
            )));
        }
        let terms: Vec<String> = entry
            .terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if terms.is_empty() {
            return Err(PayerPulseError::Config(format!(
                "{category} code `{code}` has no surface forms"
            )));
        }
        let pattern = RegexBuilder::new(&format!(r"\b(?:{})\b", terms.join("|")))
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                PayerPulseError::Config(format!("{category} code `{code}`: bad pattern: {e}"))
            })?;
        rules.push(EntityRule {
            code: code.clone(),
            display_name: entry.name.clone(),
            pattern,
        });
    }
    Ok(rules)
}

/// Physician titles are regex fragments (credentials carry dots, e.g. `M\.?D\.?`),
/// so they are joined verbatim rather than escaped.
fn compile_physician_pattern(titles: &[String]) -> Result<Option<Regex>> {
    let fragments: Vec<&str> = titles
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if fragments.is_empty() {
        return Ok(None);
    }
    let pattern = RegexBuilder::new(&format!("(?:{})", fragments.join("|")))
        .case_insensitive(true)
        .build()
        .map_err(|e| PayerPulseError::Config(format!("bad physician title pattern: {e}")))?;
    Ok(Some(pattern))
}
