//! Scoring functions for track clustering.
//!
//! This module contains:
//! - The keyword scorer (Arabic-script prior, duration prior, keyword hits)
//! - Cluster selection with threshold and declaration-order tie-break
//! - The `Classifier` seam with keyword-based and external implementations
//! - Batch classification across the rayon pool

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::catalog::Catalog;
use crate::models::{identity_key, ClassifiedTrack, ScoreMap, Track, UNCATEGORIZED};
use crate::normalize::{duration_bucket, normalize_track_text, DurationBucket, NormalizedText};
use crate::progress;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Best score below this sends the track to the fallback cluster
pub const MIN_CLUSTER_SCORE: f64 = 0.5;

// ============================================================================
// Priors
// ============================================================================
//
// Fixed bonuses wired to the catalog's prior targets. These are a domain
// judgement for catalog 1.0, not a rule derived from the keyword lists.

pub const ARABIC_SPIRITUAL_BONUS: f64 = 0.3;
pub const ARABIC_CLASSICAL_BONUS: f64 = 0.3;
pub const ARABIC_MODERN_POP_BONUS: f64 = 0.2;

/// Over 10 minutes
pub const LONG_SPIRITUAL_BONUS: f64 = 0.5;
pub const LONG_CLASSICAL_BONUS: f64 = 0.3;

/// Over 6 minutes, up to 10
pub const EXTENDED_CLASSICAL_BONUS: f64 = 0.2;
pub const EXTENDED_ELECTRONIC_BONUS: f64 = 0.1;

/// Under 3 minutes
pub const SHORT_MODERN_POP_BONUS: f64 = 0.2;
pub const SHORT_RAP_BONUS: f64 = 0.1;

// ============================================================================
// Contributions
// ============================================================================

/// Most specific field a keyword was found in. Checked in declaration order,
/// first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Title,
    Artist,
    Genre,
    Other,
}

impl MatchField {
    /// Base rate, multiplied by the cluster weight
    pub fn base(self) -> f64 {
        match self {
            MatchField::Title => 1.5,
            MatchField::Artist => 1.2,
            MatchField::Genre => 1.0,
            MatchField::Other => 0.5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchField::Title => "title",
            MatchField::Artist => "artist",
            MatchField::Genre => "genre",
            MatchField::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributionSource {
    ArabicScript,
    Duration { bucket: DurationBucket },
    Keyword { keyword: String, field: MatchField },
    /// Assignment replayed from an external cluster report
    External,
}

impl fmt::Display for ContributionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributionSource::ArabicScript => write!(f, "arabic script"),
            ContributionSource::Duration { bucket } => write!(f, "duration {}", bucket.label()),
            ContributionSource::Keyword { keyword, field } => {
                write!(f, "keyword '{}' in {}", keyword, field.label())
            }
            ContributionSource::External => write!(f, "external assignment"),
        }
    }
}

/// One additive piece of a cluster's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    /// Catalog position of the cluster
    pub cluster: usize,
    pub amount: f64,
    pub source: ContributionSource,
}

fn keyword_field(text: &NormalizedText, keyword: &str) -> MatchField {
    if text.title.contains(keyword) {
        MatchField::Title
    } else if text.artist.contains(keyword) {
        MatchField::Artist
    } else if text.genre.contains(keyword) {
        MatchField::Genre
    } else {
        MatchField::Other
    }
}

/// Every contribution for a normalized track, in a fixed order:
/// Arabic-script prior, duration prior, then keyword hits in catalog order.
pub fn contributions_for(
    text: &NormalizedText,
    bucket: Option<DurationBucket>,
    catalog: &Catalog,
) -> Vec<Contribution> {
    let targets = catalog.targets();
    let mut out = Vec::new();

    let mut prior = |cluster: usize, amount: f64, source: ContributionSource| {
        out.push(Contribution {
            cluster,
            amount,
            source,
        });
    };

    if text.has_arabic {
        prior(targets.spiritual, ARABIC_SPIRITUAL_BONUS, ContributionSource::ArabicScript);
        prior(targets.classical, ARABIC_CLASSICAL_BONUS, ContributionSource::ArabicScript);
        prior(targets.modern_pop, ARABIC_MODERN_POP_BONUS, ContributionSource::ArabicScript);
    }

    if let Some(bucket) = bucket {
        let source = || ContributionSource::Duration { bucket };
        match bucket {
            DurationBucket::Long => {
                prior(targets.spiritual, LONG_SPIRITUAL_BONUS, source());
                prior(targets.classical, LONG_CLASSICAL_BONUS, source());
            }
            DurationBucket::Extended => {
                prior(targets.classical, EXTENDED_CLASSICAL_BONUS, source());
                prior(targets.electronic, EXTENDED_ELECTRONIC_BONUS, source());
            }
            DurationBucket::Short => {
                prior(targets.modern_pop, SHORT_MODERN_POP_BONUS, source());
                prior(targets.rap, SHORT_RAP_BONUS, source());
            }
            DurationBucket::Typical => {}
        }
    }

    for (index, cluster) in catalog.clusters().iter().enumerate() {
        for keyword in &cluster.keywords {
            if !text.combined.contains(keyword.as_str()) {
                continue;
            }
            let field = keyword_field(text, keyword);
            out.push(Contribution {
                cluster: index,
                amount: cluster.weight * field.base(),
                source: ContributionSource::Keyword {
                    keyword: keyword.clone(),
                    field,
                },
            });
        }
    }

    out
}

/// Every contribution for a track.
pub fn score_contributions(track: &Track, catalog: &Catalog) -> Vec<Contribution> {
    let text = normalize_track_text(track);
    contributions_for(&text, duration_bucket(track), catalog)
}

/// Per-cluster totals, indexed by catalog position.
pub fn score_track(track: &Track, catalog: &Catalog) -> Vec<f64> {
    let mut totals = vec![0.0; catalog.clusters().len()];
    for c in score_contributions(track, catalog) {
        totals[c.cluster] += c.amount;
    }
    totals
}

// ============================================================================
// Cluster Selection
// ============================================================================

/// Outcome of classifying one track.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub cluster_id: String,
    pub score: f64,
    /// Evidence: every cluster that received a nonzero score
    pub scores: ScoreMap,
}

impl Classification {
    pub fn uncategorized(scores: ScoreMap) -> Self {
        Self {
            cluster_id: UNCATEGORIZED.to_string(),
            score: 0.0,
            scores,
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.cluster_id == UNCATEGORIZED
    }

    pub fn into_classified(self, track: Track) -> ClassifiedTrack {
        ClassifiedTrack {
            track,
            cluster_id: self.cluster_id,
            cluster_score: self.score,
            all_cluster_scores: self.scores,
        }
    }
}

/// Pick the best cluster from catalog-ordered totals.
///
/// Ties go to the cluster declared first. A best score under
/// [`MIN_CLUSTER_SCORE`] becomes `uncategorized` with score 0, but the
/// score map is kept for auditing.
pub fn select_cluster(totals: &[f64], catalog: &Catalog) -> Classification {
    let clusters = catalog.clusters();

    let scores = ScoreMap::from_entries(
        totals
            .iter()
            .enumerate()
            .filter(|(_, &score)| score > 0.0)
            .map(|(i, &score)| (clusters[i].id.clone(), score))
            .collect(),
    );

    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in totals.iter().enumerate() {
        if score > 0.0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((i, score));
        }
    }

    match best {
        Some((i, score)) if score >= MIN_CLUSTER_SCORE => Classification {
            cluster_id: clusters[i].id.clone(),
            score,
            scores,
        },
        _ => Classification::uncategorized(scores),
    }
}

// ============================================================================
// Classifiers
// ============================================================================

/// Anything that can turn a track into a cluster assignment.
///
/// The aggregator and preset generator only see [`Classification`]s, so they
/// don't care which implementation produced them.
pub trait Classifier: Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, track: &Track) -> Classification;

    /// The contributions behind `classify`, for `--explain`.
    fn evidence(&self, track: &Track) -> Vec<Contribution>;
}

/// Deterministic keyword/heuristic classifier.
pub struct KeywordClassifier<'a> {
    catalog: &'a Catalog,
}

impl<'a> KeywordClassifier<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }
}

impl Classifier for KeywordClassifier<'_> {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn classify(&self, track: &Track) -> Classification {
        select_cluster(&score_track(track, self.catalog), self.catalog)
    }

    fn evidence(&self, track: &Track) -> Vec<Contribution> {
        score_contributions(track, self.catalog)
    }
}

/// Replays assignments from a cluster report produced elsewhere, such as an
/// LLM-driven clusterer. Tracks are matched by identity key (url, else id).
pub struct ExternalClassifier<'a> {
    catalog: &'a Catalog,
    assignments: FxHashMap<String, String>,
    unregistered: Vec<String>,
}

impl<'a> ExternalClassifier<'a> {
    /// Build from a report shaped like `{ "clusters": [ { "id", "tracks": [...] } ] }`.
    /// The first assignment of a track wins.
    pub fn from_report(report: &Value, catalog: &'a Catalog) -> Result<Self> {
        let Some(clusters) = report.get("clusters").and_then(Value::as_array) else {
            bail!("External cluster report has no 'clusters' array");
        };

        let mut assignments = FxHashMap::default();
        let mut unregistered: Vec<String> = Vec::new();

        for cluster in clusters {
            let Some(cluster_id) = cluster.get("id").and_then(Value::as_str) else {
                continue;
            };
            if !catalog.is_registered(cluster_id) && !unregistered.iter().any(|u| u == cluster_id) {
                unregistered.push(cluster_id.to_string());
            }
            let tracks = cluster.get("tracks").and_then(Value::as_array);
            for track in tracks.into_iter().flatten() {
                let key = match track {
                    Value::Object(fields) => identity_key(fields),
                    _ => None,
                };
                if let Some(key) = key {
                    assignments
                        .entry(key)
                        .or_insert_with(|| cluster_id.to_string());
                }
            }
        }

        Ok(Self {
            catalog,
            assignments,
            unregistered,
        })
    }

    pub fn from_json_file(path: &Path, catalog: &'a Catalog) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read external clusters {}", path.display()))?;
        let report: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse external clusters {}", path.display()))?;
        Self::from_report(&report, catalog)
    }

    /// Number of distinct tracks with an assignment
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Catalog position of the track's assigned cluster, when it is a declared one.
    fn assigned_position(&self, track: &Track) -> Option<usize> {
        let id = self.assignments.get(&track.identity_key()?)?;
        self.catalog.position(id)
    }

    /// Cluster ids in the report that the catalog doesn't know, first-seen order.
    /// Tracks assigned to them are classified as `uncategorized`.
    pub fn unregistered_clusters(&self) -> &[String] {
        &self.unregistered
    }
}

impl Classifier for ExternalClassifier<'_> {
    fn name(&self) -> &'static str {
        "external"
    }

    fn classify(&self, track: &Track) -> Classification {
        match self.assigned_position(track) {
            Some(position) => {
                let id = &self.catalog.clusters()[position].id;
                Classification {
                    cluster_id: id.clone(),
                    score: 1.0,
                    scores: ScoreMap::from_entries(vec![(id.clone(), 1.0)]),
                }
            }
            None => Classification::uncategorized(ScoreMap::new()),
        }
    }

    fn evidence(&self, track: &Track) -> Vec<Contribution> {
        self.assigned_position(track)
            .map(|cluster| Contribution {
                cluster,
                amount: 1.0,
                source: ContributionSource::External,
            })
            .into_iter()
            .collect()
    }
}

// ============================================================================
// Batch Classification
// ============================================================================

/// Classify every track on the rayon pool. Output order matches input order.
pub fn classify_tracks(
    tracks: Vec<Track>,
    classifier: &dyn Classifier,
    pb: &ProgressBar,
) -> Vec<ClassifiedTrack> {
    let total = tracks.len() as u64;
    let interval = progress::log_interval(total);
    tracks
        .into_par_iter()
        .map(|track| {
            let classification = classifier.classify(&track);
            pb.inc(1);
            progress::log_progress("Classifying", pb.position(), total, interval);
            classification.into_classified(track)
        })
        .collect()
}
