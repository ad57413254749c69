//! Core data models for track clustering.
//!
//! This module contains the record, result and report types used throughout
//! the clustering pipeline. Tracks are kept as their original JSON objects so
//! fields this crate knows nothing about reach the output untouched.

use anyhow::Context;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Sentinel cluster for tracks nothing else claims.
pub const UNCATEGORIZED: &str = "uncategorized";

// ============================================================================
// Track Records
// ============================================================================

/// Textual track fields that feed keyword matching, in concatenation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Title,
    Artist,
    Genre,
    TagList,
    Description,
}

impl TextField {
    pub const ALL: [TextField; 5] = [
        TextField::Title,
        TextField::Artist,
        TextField::Genre,
        TextField::TagList,
        TextField::Description,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::Artist => "artist",
            TextField::Genre => "genre",
            TextField::TagList => "tag_list",
            TextField::Description => "description",
        }
    }
}

/// One track record as supplied by the acquisition side.
///
/// Only string values count as text; a field holding a number or an array is
/// treated as absent for matching but still serialized back out verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track(Map<String, Value>);

impl Track {
    /// Wrap a JSON value. Returns None for anything that isn't an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Track(fields)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string value of a text field.
    pub fn text(&self, field: TextField) -> Option<&str> {
        match self.0.get(field.key()) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.text(TextField::Title)
    }

    pub fn artist(&self) -> Option<&str> {
        self.text(TextField::Artist)
    }

    /// `duration_ms` when it is a positive number; zero counts as missing.
    pub fn duration_ms(&self) -> Option<u64> {
        match self.0.get("duration_ms")? {
            Value::Number(n) => n.as_u64().filter(|&ms| ms > 0).or_else(|| {
                n.as_f64()
                    .filter(|ms| ms.is_finite() && *ms >= 1.0)
                    .map(|ms| ms as u64)
            }),
            _ => None,
        }
    }

    /// Fallback `duration` string ("M:SS" or "H:MM:SS").
    pub fn duration_text(&self) -> Option<&str> {
        match self.0.get("duration") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Key used to recognise the same track across reports: `url`, else `id`.
    pub fn identity_key(&self) -> Option<String> {
        identity_key(&self.0)
    }
}

/// Identity key of a raw track object, without wrapping it in a [`Track`].
pub fn identity_key(fields: &Map<String, Value>) -> Option<String> {
    if let Some(Value::String(url)) = fields.get("url") {
        if !url.is_empty() {
            return Some(url.clone());
        }
    }
    match fields.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

impl From<Map<String, Value>> for Track {
    fn from(fields: Map<String, Value>) -> Self {
        Track(fields)
    }
}

/// Input artifact: `{ "source": ..., "tracks": [...] }`.
///
/// Tracks stay as raw values here; non-object entries are filtered out by the
/// caller so one bad record never fails the whole document.
#[derive(Debug, Default, Deserialize)]
pub struct TrackDump {
    #[serde(default)]
    pub source: Value,
    #[serde(default)]
    pub tracks: Vec<Value>,
}

impl TrackDump {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read track dump {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse track dump {}", path.display()))
    }
}

/// Split raw records into tracks, returning the input positions of records
/// that weren't JSON objects.
pub fn split_records(records: Vec<Value>) -> (Vec<Track>, Vec<usize>) {
    let mut tracks = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    for (i, record) in records.into_iter().enumerate() {
        match Track::from_value(record) {
            Some(track) => tracks.push(track),
            None => skipped.push(i),
        }
    }
    (tracks, skipped)
}

/// Pretty-print `value` as JSON. Non-ASCII text is written as-is.
pub fn to_json_document<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON output")
}

/// Pretty-print `value` as JSON into `path`.
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = to_json_document(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    write_documents(&[(path, json)])
}

/// Write several documents so that either all of them replace their targets or
/// none does.
///
/// Every document is staged in a `.tmp` sibling first. Targets are only renamed
/// into place once all stages are on disk; on failure the stages are removed.
pub fn write_documents(documents: &[(&Path, String)]) -> anyhow::Result<()> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(documents.len());
    for (path, contents) in documents {
        let tmp = staging_path(path);
        if let Err(e) = std::fs::write(&tmp, contents) {
            let _ = std::fs::remove_file(&tmp);
            discard_staged(&staged);
            return Err(e).with_context(|| format!("Failed to write {}", path.display()));
        }
        staged.push((tmp, *path));
    }
    for (i, (tmp, path)) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(tmp, path) {
            discard_staged(&staged[i..]);
            return Err(e).with_context(|| format!("Failed to write {}", path.display()));
        }
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard_staged(staged: &[(PathBuf, &Path)]) {
    for (tmp, _) in staged {
        let _ = std::fs::remove_file(tmp);
    }
}

// ============================================================================
// Classification Results
// ============================================================================

/// Cluster scores in catalog declaration order.
///
/// Serialized as a JSON object whose key order follows the catalog, so two
/// runs over the same input produce identical bytes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreMap(Vec<(String, f64)>);

impl ScoreMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_entries(entries: Vec<(String, f64)>) -> Self {
        Self(entries)
    }

    pub fn get(&self, cluster_id: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(id, _)| id == cluster_id)
            .map(|(_, score)| *score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(id, score)| (id.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(id, score)| (id, score)))
    }
}

/// Track plus its cluster assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedTrack {
    pub track: Track,
    pub cluster_id: String,
    pub cluster_score: f64,
    pub all_cluster_scores: ScoreMap,
}

const CLASSIFICATION_KEYS: [&str; 3] = ["cluster_id", "cluster_score", "all_cluster_scores"];

impl Serialize for ClassifiedTrack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let passthrough = self
            .track
            .fields()
            .iter()
            .filter(|(key, _)| !CLASSIFICATION_KEYS.contains(&key.as_str()));

        let mut map = serializer.serialize_map(None)?;
        for (key, value) in passthrough {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("cluster_id", &self.cluster_id)?;
        map.serialize_entry("cluster_score", &self.cluster_score)?;
        map.serialize_entry("all_cluster_scores", &self.all_cluster_scores)?;
        map.end()
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Title/artist/url excerpt of a track, values copied as-is (null when absent).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleTrack {
    pub title: Option<Value>,
    pub artist: Option<Value>,
    pub url: Option<Value>,
}

impl SampleTrack {
    pub fn of(track: &Track) -> Self {
        Self {
            title: track.get("title").cloned(),
            artist: track.get("artist").cloned(),
            url: track.get("url").cloned(),
        }
    }
}

/// One populated cluster in the report.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterSummary {
    pub id: String,
    pub name: String,
    pub track_count: usize,
    pub unique_artists: usize,
    pub avg_duration_min: f64,
    pub sample_tracks: Vec<SampleTrack>,
    pub tracks: Vec<ClassifiedTrack>,
}

/// Output artifact 1: the cluster report.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterReport {
    pub source: Value,
    pub total_tracks: usize,
    pub cluster_count: usize,
    pub clustered_at: String,
    pub clusters: Vec<ClusterSummary>,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run clustering statistics.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ClusteringStats {
    pub records_read: usize,
    pub records_skipped: usize,
    pub tracks_classified: usize,
    pub uncategorized: usize,
    pub arabic_script_tracks: usize,
    pub unknown_duration_tracks: usize,
    pub clusters_populated: usize,
    pub classifier: String,

    // Timing
    pub elapsed_seconds: f64,
}

impl ClusteringStats {
    /// Share of classified tracks that landed in the sentinel cluster, in percent
    pub fn uncategorized_rate(&self) -> f64 {
        if self.tracks_classified == 0 {
            0.0
        } else {
            100.0 * self.uncategorized as f64 / self.tracks_classified as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        write_json_file(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track(value: Value) -> Track {
        Track::from_value(value).unwrap()
    }

    #[test]
    fn test_non_object_records_rejected() {
        assert!(Track::from_value(json!(null)).is_none());
        assert!(Track::from_value(json!("title")).is_none());
        assert!(Track::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_text_ignores_empty_and_non_string_fields() {
        let t = track(json!({"title": "", "artist": 42, "genre": "Sufi"}));
        assert_eq!(t.title(), None);
        assert_eq!(t.artist(), None);
        assert_eq!(t.text(TextField::Genre), Some("Sufi"));
        assert_eq!(t.text(TextField::Description), None);
    }

    #[test]
    fn test_duration_ms_truthiness() {
        assert_eq!(track(json!({"duration_ms": 215000})).duration_ms(), Some(215000));
        assert_eq!(track(json!({"duration_ms": 0})).duration_ms(), None);
        assert_eq!(track(json!({"duration_ms": -5})).duration_ms(), None);
        assert_eq!(track(json!({"duration_ms": 1500.7})).duration_ms(), Some(1500));
        assert_eq!(track(json!({"duration_ms": "215000"})).duration_ms(), None);
        assert_eq!(track(json!({})).duration_ms(), None);
    }

    #[test]
    fn test_identity_key_prefers_url() {
        let t = track(json!({"url": "https://example.com/a", "id": 7}));
        assert_eq!(t.identity_key().as_deref(), Some("https://example.com/a"));
        assert_eq!(track(json!({"id": 7})).identity_key().as_deref(), Some("7"));
        assert_eq!(track(json!({"url": ""})).identity_key(), None);
    }

    #[test]
    fn test_score_map_keeps_insertion_order() {
        let scores = ScoreMap::from_entries(vec![
            ("zeta".to_string(), 1.0),
            ("alpha".to_string(), 0.5),
        ]);
        let json = serde_json::to_string(&scores).unwrap();
        assert_eq!(json, r#"{"zeta":1.0,"alpha":0.5}"#);
        assert_eq!(scores.get("alpha"), Some(0.5));
        assert_eq!(scores.get("missing"), None);
    }

    #[test]
    fn test_classified_track_passthrough_and_override() {
        let classified = ClassifiedTrack {
            track: track(json!({
                "title": "Song",
                "plays": 12,
                "cluster_id": "stale",
                "extra": {"nested": [1, 2]}
            })),
            cluster_id: "arabic_pop".to_string(),
            cluster_score: 1.5,
            all_cluster_scores: ScoreMap::from_entries(vec![("arabic_pop".to_string(), 1.5)]),
        };
        let value = serde_json::to_value(&classified).unwrap();
        assert_eq!(value["plays"], json!(12));
        assert_eq!(value["extra"], json!({"nested": [1, 2]}));
        assert_eq!(value["cluster_id"], json!("arabic_pop"));
        assert_eq!(value["all_cluster_scores"], json!({"arabic_pop": 1.5}));
    }

    #[test]
    fn test_sample_track_nulls_for_missing_fields() {
        let sample = SampleTrack::of(&track(json!({"title": "Only title"})));
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value, json!({"title": "Only title", "artist": null, "url": null}));
    }

    #[test]
    fn test_track_dump_defaults() {
        let dump: TrackDump = serde_json::from_str(r#"{"tracks": []}"#).unwrap();
        assert!(dump.tracks.is_empty());
        assert_eq!(dump.source, Value::Null);

        let dump: TrackDump = serde_json::from_str("{}").unwrap();
        assert!(dump.tracks.is_empty());
    }

    #[test]
    fn test_uncategorized_rate_guards_zero() {
        let stats = ClusteringStats::default();
        assert_eq!(stats.uncategorized_rate(), 0.0);
    }

    #[test]
    fn test_split_records_reports_skipped_positions() {
        let (tracks, skipped) = split_records(vec![
            json!({"title": "a"}),
            json!(null),
            json!({"title": "b"}),
            json!(["x"]),
        ]);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].title(), Some("b"));
        assert_eq!(skipped, vec![1, 3]);
    }

    #[test]
    fn test_json_file_round_trip_keeps_arabic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("likes.json");
        let dump = json!({"source": "soundcloud", "tracks": [{"title": "ذكر الله", "plays": 3}]});
        write_json_file(&path, &dump).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("ذكر الله"));

        let read = TrackDump::from_json_file(&path).unwrap();
        assert_eq!(read.source, json!("soundcloud"));
        assert_eq!(read.tracks.len(), 1);
    }

    #[test]
    fn test_missing_dump_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrackDump::from_json_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read track dump"));
    }

    #[test]
    fn test_documents_are_written_together_or_not_at_all() {
        let dir = tempfile::tempdir().unwrap();
        let compact = dir.path().join("eq_presets.json");
        let detailed = dir.path().join("missing").join("eq_presets_detailed.json");

        let err = write_documents(&[
            (compact.as_path(), "{}".to_string()),
            (detailed.as_path(), "{}".to_string()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("eq_presets_detailed.json"));
        assert!(!compact.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_documents_replace_targets_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let compact = dir.path().join("eq_presets.json");
        let detailed = dir.path().join("eq_presets_detailed.json");
        std::fs::write(&compact, "old").unwrap();

        write_documents(&[
            (compact.as_path(), to_json_document(&json!({"a": 1})).unwrap()),
            (detailed.as_path(), to_json_document(&json!({"b": 2})).unwrap()),
        ])
        .unwrap();

        assert_eq!(std::fs::read_to_string(&compact).unwrap(), "{\n  \"a\": 1\n}");
        assert!(std::fs::read_to_string(&detailed).unwrap().contains("\"b\": 2"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_identity_key_reads_raw_objects() {
        let by_url = json!({"url": "https://x/1", "id": 7});
        let by_number = json!({"url": "", "id": 7});
        let blank = json!({"url": "", "id": ""});
        assert_eq!(identity_key(by_url.as_object().unwrap()).as_deref(), Some("https://x/1"));
        assert_eq!(identity_key(by_number.as_object().unwrap()).as_deref(), Some("7"));
        assert_eq!(identity_key(blank.as_object().unwrap()), None);
    }
}
