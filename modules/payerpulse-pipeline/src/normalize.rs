//! Text and timestamp normalization. Pure, deterministic, idempotent:
//! normalizing already-normalized text yields the same text.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

use payerpulse_common::PayerPulseError;

static SHORTENER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:bit\.ly|t\.co|tinyurl\.com|goo\.gl|ow\.ly|lnkd\.in|buff\.ly)/\S+")
        .expect("valid regex")
});

static TRAILING_TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s|^)(?:#\w+\s*)+$").expect("valid regex"));

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*(m|min|mins|minutes?|h|hrs?|hours?|d|days?|w|wks?|weeks?)\s+ago\s*$")
        .expect("valid regex")
});

const ABSOLUTE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct Normalizer {
    strip_trailing_hashtags: bool,
}

impl Normalizer {
    pub fn new(strip_trailing_hashtags: bool) -> Self {
        Self {
            strip_trailing_hashtags,
        }
    }

    /// Clean post text: drop link-shortener URLs, strip the trailing hashtag
    /// run (if enabled), collapse whitespace, trim.
    pub fn normalize_text(&self, raw: &str) -> String {
        let mut text = SHORTENER_RE.replace_all(raw, " ").into_owned();
        if self.strip_trailing_hashtags {
            text = TRAILING_TAGS_RE.replace(&text, " ").into_owned();
        }
        WS_RE.replace_all(text.trim(), " ").into_owned()
    }

    /// Parse an absolute timestamp, or resolve a relative expression
    /// ("2d ago", "3 hours ago") against the reference instant.
    pub fn normalize_timestamp(
        &self,
        raw: &str,
        reference: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, PayerPulseError> {
        if let Some(caps) = RELATIVE_RE.captures(raw) {
            let n: i64 = caps[1].parse().map_err(|_| {
                PayerPulseError::Normalization(format!("relative timestamp out of range: `{raw}`"))
            })?;
            let delta = match caps[2].to_lowercase().as_bytes()[0] {
                b'm' => Duration::minutes(n),
                b'h' => Duration::hours(n),
                b'd' => Duration::days(n),
                b'w' => Duration::weeks(n),
                _ => unreachable!("unit alternation is exhaustive"),
            };
            return Ok(reference - delta);
        }

        let s = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        for fmt in ABSOLUTE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(naive.and_utc());
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(date.and_time(NaiveTime::MIN).and_utc());
        }

        Err(PayerPulseError::Normalization(format!(
            "unparseable timestamp: `{raw}`"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn norm() -> Normalizer {
        Normalizer::new(true)
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(
            norm().normalize_text("  UHC   denied \n our claim  "),
            "UHC denied our claim"
        );
    }

    #[test]
    fn strips_trailing_hashtag_run_only() {
        assert_eq!(
            norm().normalize_text("Filed a #priorauth appeal today #healthcare #denied"),
            "Filed a #priorauth appeal today"
        );
    }

    #[test]
    fn keeps_trailing_hashtags_when_disabled() {
        let n = Normalizer::new(false);
        assert_eq!(n.normalize_text("appeal today #denied"), "appeal today #denied");
    }

    #[test]
    fn removes_link_shortener_urls() {
        assert_eq!(
            norm().normalize_text("Read this https://bit.ly/3xYzAb and this https://t.co/q1w2e3"),
            "Read this and this"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let n = norm();
        let once = n.normalize_text("Claim denied again   https://bit.ly/x #fail #uhc");
        let twice = n.normalize_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn parses_rfc3339() {
        let ts = norm()
            .normalize_timestamp("2026-08-20T09:30:00Z", reference())
            .unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 8, 20, 9, 30, 0).unwrap());
    }

    #[test]
    fn parses_naive_datetime_as_utc() {
        let ts = norm()
            .normalize_timestamp("2026-08-20 09:30:00", reference())
            .unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 8, 20, 9, 30, 0).unwrap());
    }

    #[test]
    fn resolves_relative_expressions() {
        let n = norm();
        let r = reference();
        assert_eq!(n.normalize_timestamp("2d ago", r).unwrap(), r - Duration::days(2));
        assert_eq!(n.normalize_timestamp("3 hours ago", r).unwrap(), r - Duration::hours(3));
        assert_eq!(n.normalize_timestamp("1w ago", r).unwrap(), r - Duration::weeks(1));
        assert_eq!(n.normalize_timestamp("45m ago", r).unwrap(), r - Duration::minutes(45));
    }

    #[test]
    fn unparseable_timestamp_is_a_normalization_error() {
        let err = norm()
            .normalize_timestamp("yesterday-ish", reference())
            .unwrap_err();
        assert!(matches!(err, PayerPulseError::Normalization(_)));
    }
}
