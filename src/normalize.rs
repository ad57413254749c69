//! Text and duration normalization for keyword clustering.
//! Used by the keyword scorer and by the per-run statistics.
//!
//! Matching is plain lower-casing: no diacritic folding, no transliteration.
//! Arabic keywords have to match the track text exactly as written.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{TextField, Track};

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Arabic, Arabic Supplement and Arabic Extended-A blocks.
pub static ARABIC_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{0600}-\u{06FF}\u{0750}-\u{077F}\u{08A0}-\u{08FF}]").unwrap()
});

// ============================================================================
// TEXT NORMALIZATION
// ============================================================================

/// Matching surface for one track.
///
/// `combined` joins every non-empty text field with a single space, so a
/// keyword can straddle two fields (e.g. a title ending in "hip" and an artist
/// starting with "hop"). Such hits fall through to the lowest field rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedText {
    pub combined: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub has_arabic: bool,
}

pub fn has_arabic_script(text: &str) -> bool {
    ARABIC_SCRIPT.is_match(text)
}

/// Build the lower-cased matching surface and detect Arabic script.
/// Arabic detection runs on the raw field values, before concatenation.
pub fn normalize_track_text(track: &Track) -> NormalizedText {
    let mut parts = Vec::with_capacity(TextField::ALL.len());
    let mut has_arabic = false;

    for field in TextField::ALL {
        if let Some(value) = track.text(field) {
            has_arabic |= has_arabic_script(value);
            parts.push(value.to_lowercase());
        }
    }

    let lower = |field: TextField| track.text(field).map(str::to_lowercase).unwrap_or_default();

    NormalizedText {
        combined: parts.join(" "),
        title: lower(TextField::Title),
        artist: lower(TextField::Artist),
        genre: lower(TextField::Genre),
        has_arabic,
    }
}

// ============================================================================
// DURATION HEURISTIC
// ============================================================================

/// Coarse track length classes fed to the scorer's duration priors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationBucket {
    /// Over 10 minutes
    Long,
    /// Over 6 minutes, up to 10
    Extended,
    /// 3 to 6 minutes, no prior applies
    Typical,
    /// Under 3 minutes
    Short,
}

impl DurationBucket {
    /// Buckets are checked longest first, so each track lands in exactly one.
    pub fn from_minutes(minutes: f64) -> Self {
        if minutes > 10.0 {
            DurationBucket::Long
        } else if minutes > 6.0 {
            DurationBucket::Extended
        } else if minutes < 3.0 {
            DurationBucket::Short
        } else {
            DurationBucket::Typical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationBucket::Long => ">10min",
            DurationBucket::Extended => "6-10min",
            DurationBucket::Typical => "3-6min",
            DurationBucket::Short => "<3min",
        }
    }
}

/// Parse "M:SS" or "H:MM:SS" into seconds.
/// Anything else (wrong part count, non-integer parts, overflow) is None.
pub fn parse_duration_seconds(text: &str) -> Option<i64> {
    let parts = text
        .split(':')
        .map(|p| p.trim().parse::<i64>().ok())
        .collect::<Option<Vec<i64>>>()?;

    match parts.as_slice() {
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        _ => None,
    }
}

/// Resolve a track's duration in milliseconds.
/// `duration_ms` wins when set; otherwise the `duration` string is parsed.
/// Zero or negative results count as unknown.
pub fn resolve_duration_ms(track: &Track) -> Option<u64> {
    if let Some(ms) = track.duration_ms() {
        return Some(ms);
    }
    let secs = parse_duration_seconds(track.duration_text()?)?;
    if secs <= 0 {
        return None;
    }
    u64::try_from(secs).ok()?.checked_mul(1000)
}

pub fn duration_minutes(ms: u64) -> f64 {
    ms as f64 / 60_000.0
}

pub fn duration_bucket(track: &Track) -> Option<DurationBucket> {
    resolve_duration_ms(track).map(|ms| DurationBucket::from_minutes(duration_minutes(ms)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track(value: serde_json::Value) -> Track {
        Track::from_value(value).unwrap()
    }

    #[test]
    fn test_combined_text_skips_missing_fields() {
        let norm = normalize_track_text(&track(json!({
            "title": "Sufi Night",
            "genre": "",
            "tag_list": "Live Oud",
            "description": null
        })));
        assert_eq!(norm.combined, "sufi night live oud");
        assert_eq!(norm.title, "sufi night");
        assert_eq!(norm.artist, "");
        assert!(!norm.has_arabic);
    }

    #[test]
    fn test_combined_text_field_order() {
        let norm = normalize_track_text(&track(json!({
            "description": "E",
            "tag_list": "D",
            "genre": "C",
            "artist": "B",
            "title": "A"
        })));
        assert_eq!(norm.combined, "a b c d e");
    }

    #[test]
    fn test_empty_track_normalizes_to_nothing() {
        let norm = normalize_track_text(&Track::default());
        assert_eq!(norm, NormalizedText::default());
    }

    #[test]
    fn test_arabic_detection_ranges() {
        assert!(has_arabic_script("ذكر الله"));
        assert!(has_arabic_script("mix \u{0750} supplement"));
        assert!(has_arabic_script("\u{08A0}"));
        assert!(!has_arabic_script("Umm Kulthum"));
        assert!(!has_arabic_script("кино"));
    }

    #[test]
    fn test_arabic_detected_in_any_field() {
        let norm = normalize_track_text(&track(json!({
            "title": "Night",
            "description": "حفلة"
        })));
        assert!(norm.has_arabic);
    }

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(parse_duration_seconds("3:45"), Some(225));
        assert_eq!(parse_duration_seconds("1:02:03"), Some(3723));
        assert_eq!(parse_duration_seconds("0:00"), Some(0));
        assert_eq!(parse_duration_seconds("45"), None);
        assert_eq!(parse_duration_seconds("1:2:3:4"), None);
        assert_eq!(parse_duration_seconds("3:4x"), None);
        assert_eq!(parse_duration_seconds("3.5:00"), None);
        assert_eq!(parse_duration_seconds(""), None);
    }

    #[test]
    fn test_resolve_duration_prefers_ms() {
        let t = track(json!({"duration_ms": 120000, "duration": "10:00"}));
        assert_eq!(resolve_duration_ms(&t), Some(120000));

        let t = track(json!({"duration_ms": 0, "duration": "10:00"}));
        assert_eq!(resolve_duration_ms(&t), Some(600000));

        let t = track(json!({"duration": "0:00"}));
        assert_eq!(resolve_duration_ms(&t), None);

        let t = track(json!({"duration": "garbage"}));
        assert_eq!(resolve_duration_ms(&t), None);

        let t = track(json!({"duration": 215}));
        assert_eq!(resolve_duration_ms(&t), None);
    }

    #[test]
    fn test_duration_buckets_are_exclusive() {
        assert_eq!(DurationBucket::from_minutes(12.0), DurationBucket::Long);
        assert_eq!(DurationBucket::from_minutes(10.0), DurationBucket::Extended);
        assert_eq!(DurationBucket::from_minutes(6.5), DurationBucket::Extended);
        assert_eq!(DurationBucket::from_minutes(6.0), DurationBucket::Typical);
        assert_eq!(DurationBucket::from_minutes(3.0), DurationBucket::Typical);
        assert_eq!(DurationBucket::from_minutes(2.9), DurationBucket::Short);
    }

    #[test]
    fn test_duration_bucket_unknown() {
        assert_eq!(duration_bucket(&Track::default()), None);
        let t = track(json!({"duration": "12:00"}));
        assert_eq!(duration_bucket(&t), Some(DurationBucket::Long));
    }
}
