//! Aggregation of classified tracks into per-cluster statistics.
//!
//! Tracks are folded in chunks on the rayon pool and the partial results are
//! merged in chunk order, so sample lists stay in input order no matter which
//! worker finishes first.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use crate::catalog::Catalog;
use crate::models::{ClassifiedTrack, ClusterReport, ClusterSummary, SampleTrack, Track};

/// Sample tracks kept per cluster, earliest first
pub const MAX_SAMPLE_TRACKS: usize = 5;

const FOLD_CHUNK_SIZE: usize = 4096;

// ============================================================================
// Per-Cluster Statistics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterStats {
    pub count: usize,
    /// Sum of positive numeric `duration_ms` values, saturating. Tracks known
    /// only through the `duration` string are not included.
    pub total_duration_ms: u64,
    /// Exact-string artist identity, case-sensitive
    pub artists: FxHashSet<String>,
    pub sample_tracks: Vec<SampleTrack>,
}

impl ClusterStats {
    pub fn record(&mut self, track: &Track) {
        self.count += 1;
        if let Some(ms) = track.duration_ms() {
            self.total_duration_ms = self.total_duration_ms.saturating_add(ms);
        }
        if let Some(artist) = track.artist() {
            self.artists.insert(artist.to_string());
        }
        if self.sample_tracks.len() < MAX_SAMPLE_TRACKS {
            self.sample_tracks.push(SampleTrack::of(track));
        }
    }

    /// Fold in stats for tracks that came after this one's in input order.
    pub fn merge(&mut self, later: ClusterStats) {
        self.count += later.count;
        self.total_duration_ms = self.total_duration_ms.saturating_add(later.total_duration_ms);
        self.artists.extend(later.artists);
        let room = MAX_SAMPLE_TRACKS.saturating_sub(self.sample_tracks.len());
        self.sample_tracks
            .extend(later.sample_tracks.into_iter().take(room));
    }

    /// Mean duration in minutes, one decimal. 0 when nothing is known.
    pub fn avg_duration_min(&self) -> f64 {
        if self.count == 0 || self.total_duration_ms == 0 {
            return 0.0;
        }
        let minutes = self.total_duration_ms as f64 / self.count as f64 / 60_000.0;
        (minutes * 10.0).round() / 10.0
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Cluster stats keyed by id, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    index: FxHashMap<String, usize>,
    clusters: Vec<(String, ClusterStats)>,
}

impl Aggregation {
    fn slot(&mut self, cluster_id: &str) -> &mut ClusterStats {
        let i = match self.index.get(cluster_id) {
            Some(&i) => i,
            None => {
                self.index
                    .insert(cluster_id.to_string(), self.clusters.len());
                self.clusters
                    .push((cluster_id.to_string(), ClusterStats::default()));
                self.clusters.len() - 1
            }
        };
        &mut self.clusters[i].1
    }

    pub fn record(&mut self, classified: &ClassifiedTrack) {
        self.slot(&classified.cluster_id).record(&classified.track);
    }

    /// Merge an aggregation over a later slice of the input.
    pub fn merge(&mut self, later: Aggregation) {
        for (cluster_id, stats) in later.clusters {
            self.slot(&cluster_id).merge(stats);
        }
    }

    pub fn get(&self, cluster_id: &str) -> Option<&ClusterStats> {
        self.index.get(cluster_id).map(|&i| &self.clusters[i].1)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Largest cluster first; equal counts follow catalog declaration order,
    /// with unregistered ids (including `uncategorized`) after every
    /// registered one.
    pub fn into_sorted(self, catalog: &Catalog) -> Vec<(String, ClusterStats)> {
        let mut clusters = self.clusters;
        clusters.sort_by(|(a_id, a), (b_id, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| catalog.rank(a_id).cmp(&catalog.rank(b_id)))
        });
        clusters
    }
}

fn fold_chunk(chunk: &[ClassifiedTrack]) -> Aggregation {
    let mut agg = Aggregation::default();
    for classified in chunk {
        agg.record(classified);
    }
    agg
}

/// Fold every classified track into per-cluster stats.
pub fn aggregate(classified: &[ClassifiedTrack]) -> Aggregation {
    let partials: Vec<Aggregation> = classified
        .par_chunks(FOLD_CHUNK_SIZE)
        .map(fold_chunk)
        .collect();

    let mut total = Aggregation::default();
    for partial in partials {
        total.merge(partial);
    }
    total
}

// ============================================================================
// Cluster Report
// ============================================================================

/// Build the cluster report. Tracks keep input order within their cluster.
pub fn build_report(
    source: Value,
    classified: Vec<ClassifiedTrack>,
    catalog: &Catalog,
    clustered_at: String,
) -> ClusterReport {
    let total_tracks = classified.len();
    let sorted = aggregate(&classified).into_sorted(catalog);

    let mut members: FxHashMap<String, Vec<ClassifiedTrack>> = FxHashMap::default();
    for track in classified {
        members
            .entry(track.cluster_id.clone())
            .or_default()
            .push(track);
    }

    let clusters: Vec<ClusterSummary> = sorted
        .into_iter()
        .map(|(id, stats)| ClusterSummary {
            name: catalog.cluster_name(&id),
            track_count: stats.count,
            unique_artists: stats.artists.len(),
            avg_duration_min: stats.avg_duration_min(),
            tracks: members.remove(&id).unwrap_or_default(),
            sample_tracks: stats.sample_tracks,
            id,
        })
        .collect();

    ClusterReport {
        source,
        total_tracks,
        cluster_count: clusters.len(),
        clustered_at,
        clusters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScoreMap, UNCATEGORIZED};
    use serde_json::json;

    fn classified(cluster_id: &str, fields: Value) -> ClassifiedTrack {
        ClassifiedTrack {
            track: Track::from_value(fields).unwrap(),
            cluster_id: cluster_id.to_string(),
            cluster_score: 1.0,
            all_cluster_scores: ScoreMap::from_entries(vec![(cluster_id.to_string(), 1.0)]),
        }
    }

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    #[test]
    fn test_sample_cap_keeps_input_order() {
        let tracks: Vec<ClassifiedTrack> = (0..8)
            .map(|i| classified("instrumental", json!({"title": format!("t{}", i), "plays": i})))
            .collect();
        let agg = aggregate(&tracks);
        let stats = agg.get("instrumental").unwrap();
        assert_eq!(stats.count, 8);
        let titles: Vec<Value> = stats
            .sample_tracks
            .iter()
            .map(|s| s.title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec![json!("t0"), json!("t1"), json!("t2"), json!("t3"), json!("t4")]);
        assert_eq!(stats.sample_tracks[0].url, None);
    }

    #[test]
    fn test_duplicate_tracks_double_count_and_duration() {
        let a = classified("arabic_pop", json!({"artist": "Elissa", "duration_ms": 200_000}));
        let b = classified("arabic_pop", json!({"artist": "Nancy", "duration": "3:00"}));

        let once = aggregate(&[a.clone(), b.clone()]);
        let twice = aggregate(&[a.clone(), b.clone(), a, b]);

        let once = once.get("arabic_pop").unwrap();
        let twice = twice.get("arabic_pop").unwrap();
        assert_eq!(twice.count, 2 * once.count);
        assert_eq!(twice.total_duration_ms, 2 * once.total_duration_ms);
        assert_eq!(once.total_duration_ms, 200_000);
        assert_eq!(twice.artists, once.artists);
    }

    #[test]
    fn test_artists_are_case_sensitive() {
        let tracks = vec![
            classified("arabic_classical", json!({"artist": "Fairuz"})),
            classified("arabic_classical", json!({"artist": "fairuz"})),
            classified("arabic_classical", json!({"artist": "Fairuz"})),
            classified("arabic_classical", json!({"artist": ""})),
        ];
        let agg = aggregate(&tracks);
        assert_eq!(agg.get("arabic_classical").unwrap().artists.len(), 2);
    }

    #[test]
    fn test_avg_duration_guards() {
        let mut stats = ClusterStats::default();
        assert_eq!(stats.avg_duration_min(), 0.0);

        stats.record(&Track::from_value(json!({"duration": "4:00"})).unwrap());
        assert_eq!(stats.avg_duration_min(), 0.0);

        stats.record(&Track::from_value(json!({"duration_ms": 370_000})).unwrap());
        // 370000 / 2 / 60000 = 3.083..
        assert_eq!(stats.avg_duration_min(), 3.1);
    }

    #[test]
    fn test_huge_durations_saturate() {
        let tracks = vec![
            classified("instrumental", json!({"title": "A", "duration_ms": 1.0e19})),
            classified("instrumental", json!({"title": "B", "duration_ms": 1.0e19})),
        ];
        let agg = aggregate(&tracks);
        let stats = agg.get("instrumental").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_duration_ms, u64::MAX);

        let mut merged = fold_chunk(&tracks[..1]);
        merged.merge(fold_chunk(&tracks[1..]));
        assert_eq!(merged.get("instrumental").unwrap().total_duration_ms, u64::MAX);

        let report = build_report(json!("likes"), tracks, &catalog(), "now".into());
        assert!(report.clusters[0].avg_duration_min > 0.0);
    }

    #[test]
    fn test_merge_matches_sequential_fold() {
        let tracks: Vec<ClassifiedTrack> = (0..20)
            .map(|i| {
                let id = if i % 3 == 0 { "rock_alternative" } else { "world_fusion" };
                let artist = format!("a{}", i % 4);
                classified(id, json!({"title": i, "artist": artist, "duration_ms": 1000 * i}))
            })
            .collect();

        let whole = fold_chunk(&tracks);
        let mut pieces = fold_chunk(&tracks[..3]);
        pieces.merge(fold_chunk(&tracks[3..11]));
        pieces.merge(fold_chunk(&tracks[11..]));

        for id in ["rock_alternative", "world_fusion"] {
            assert_eq!(whole.get(id), pieces.get(id));
        }
        assert_eq!(aggregate(&tracks).get("world_fusion"), whole.get("world_fusion"));
    }

    #[test]
    fn test_order_by_count_then_catalog() {
        let tracks = vec![
            classified(UNCATEGORIZED, json!({})),
            classified("hip_hop_rap", json!({})),
            classified("sufi_religious", json!({})),
            classified("electronic_edm", json!({})),
            classified("electronic_edm", json!({})),
        ];
        let catalog = catalog();
        let order: Vec<String> = aggregate(&tracks)
            .into_sorted(&catalog)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(
            order,
            vec!["electronic_edm", "sufi_religious", "hip_hop_rap", UNCATEGORIZED]
        );
    }

    #[test]
    fn test_empty_input_report() {
        let generated_at = "2024-01-01T00:00:00+00:00".to_string();
        let report = build_report(Value::Null, Vec::new(), &catalog(), generated_at);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_tracks"], json!(0));
        assert_eq!(json["cluster_count"], json!(0));
        assert_eq!(json["clusters"], json!([]));
    }

    #[test]
    fn test_report_shape() {
        let tracks = vec![
            classified(
                "sufi_religious",
                json!({"title": "A", "url": "u1", "plays": 10, "duration_ms": 720_000}),
            ),
            classified(UNCATEGORIZED, json!({"title": "B"})),
            classified("sufi_religious", json!({"title": "C", "artist": "X"})),
        ];
        let report = build_report(json!("likes"), tracks, &catalog(), "now".into());
        assert_eq!(report.total_tracks, 3);
        assert_eq!(report.cluster_count, 2);

        let sufi = &report.clusters[0];
        assert_eq!(sufi.id, "sufi_religious");
        assert_eq!(sufi.name, "Sufi / Religious");
        assert_eq!(sufi.track_count, 2);
        assert_eq!(sufi.unique_artists, 1);
        assert_eq!(sufi.avg_duration_min, 6.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["clusters"][0]["tracks"][0]["plays"], json!(10));
        assert_eq!(json["clusters"][0]["tracks"][1]["title"], json!("C"));
        assert_eq!(json["clusters"][1]["name"], json!("Uncategorized"));
        assert_eq!(json["source"], json!("likes"));
    }
}
