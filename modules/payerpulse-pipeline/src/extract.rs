//! Dictionary-based entity extraction. Matches normalized text against the
//! rule book's compiled surface-form patterns, one set of codes per category.

use std::collections::BTreeSet;
use std::sync::Arc;

use payerpulse_common::{EntityCategory, RuleBook};

/// Matched entity codes for one post. Sets are ordered, so results are
/// independent of dictionary iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub payers: BTreeSet<String>,
    pub procedures: BTreeSet<String>,
    pub topics: BTreeSet<String>,
}

pub struct EntityExtractor {
    rules: Arc<RuleBook>,
}

impl EntityExtractor {
    pub fn new(rules: Arc<RuleBook>) -> Self {
        Self { rules }
    }

    /// Codes whose pattern matches anywhere in the text, per category.
    /// Multiple hits for one code still yield the code once; no match at
    /// all is an empty set, never an error.
    pub fn extract(&self, text: &str) -> ExtractedEntities {
        ExtractedEntities {
            payers: self.match_category(EntityCategory::Payer, text),
            procedures: self.match_category(EntityCategory::Procedure, text),
            topics: self.match_category(EntityCategory::Topic, text),
        }
    }

    fn match_category(&self, category: EntityCategory, text: &str) -> BTreeSet<String> {
        self.rules
            .entity_rules(category)
            .iter()
            .filter(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.code.clone())
            .collect()
    }
}
