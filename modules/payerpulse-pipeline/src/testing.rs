//! Shared fixtures for unit and integration tests.

use serde_json::json;

use payerpulse_common::{RawRecord, RuleBook};

/// A small but realistic rule book covering every rule kind.
pub fn sample_rules() -> RuleBook {
    RuleBook::from_json(
        r#"{
        "version": 1,
        "payers": {
            "UHC": {"name": "UnitedHealthcare", "terms": ["UHC", "UnitedHealthcare", "United Healthcare", "Optum"]},
            "AETNA": {"name": "Aetna", "terms": ["Aetna", "CVS Health"]}
        },
        "procedures": {
            "PRIOR_AUTH": {"name": "Prior authorization", "terms": ["prior auth", "prior authorization", "pre-auth"]},
            "IMAGING": {"name": "Imaging", "terms": ["MRI", "CT scan", "imaging"]}
        },
        "topics": {
            "DENIAL": {"name": "Claim denial", "terms": ["denied", "denial", "claim rejected"]},
            "BILLING": {"name": "Billing", "terms": ["billing", "invoice", "surprise bill"]}
        },
        "sentiment": {
            "thresholds": {"positive": 0.15, "negative": -0.15},
            "lexicon": {
                "love": 0.7, "great": 0.6, "helpful": 0.5, "approved": 0.4,
                "denied": -0.6, "awful": -0.8, "frustrating": -0.5, "worst": -0.9
            }
        },
        "influence": {"likes": 1.0, "comments": 2.0, "reposts": 3.0},
        "physician_titles": ["\\bM\\.?D\\b", "\\bD\\.?O\\b", "\\bDr\\b\\.?", "physician", "surgeon", "cardiologist"]
    }"#,
    )
    .expect("sample rules are valid")
}

/// A raw post document with every field populated.
pub fn sample_raw(post_id: &str) -> RawRecord {
    RawRecord {
        source: "2026-08-28.ndjson".to_string(),
        line: 1,
        doc: json!({
            "post_id": post_id,
            "author_id": "li-772",
            "author_name": "Jordan Reyes",
            "author_title": "Practice Manager",
            "author_profile_url": "https://example.com/in/jordanreyes",
            "content": "UHC denied our prior auth again, awful #priorauth #denied",
            "posted_at": "2d ago",
            "likes": 10,
            "comments": 5,
            "reposts": 2,
            "captured_at": "2026-08-28T08:00:00Z"
        }),
    }
}
