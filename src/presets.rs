//! EQ preset catalogs generated from a cluster report.
//!
//! Two forms are produced from the same matched presets:
//! - Compact, device-facing: ordered `{frequency, gain}` band lists
//! - Detailed, for auditing: cluster context, characteristics, a few samples
//!
//! Only clusters present in both the report and the catalog get a preset.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::catalog::{Catalog, EqBands, EqPreset};
use crate::models::SampleTrack;

pub const CATALOG_NAME: &str = "Auto-EQ Presets";
pub const CATALOG_DESCRIPTION: &str = "Auto-generated presets based on track clustering";

/// Sample tracks carried into the detailed form
pub const DETAILED_SAMPLE_TRACKS: usize = 3;

/// Bands at or beyond this magnitude show up in the summary table
pub const NOTABLE_GAIN_DB: i32 = 3;
const MAX_NOTABLE_BANDS: usize = 3;

// ============================================================================
// Cluster Report (input)
// ============================================================================

/// The parts of a cluster report the preset generator reads. Per-track
/// lists are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportView {
    #[serde(default)]
    pub source: Value,
    #[serde(default)]
    pub total_tracks: Value,
    #[serde(default)]
    pub clusters: Vec<ReportCluster>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportCluster {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub track_count: usize,
    #[serde(default)]
    pub sample_tracks: Vec<SampleTrack>,
}

impl ReportView {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cluster report {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse cluster report {}", path.display()))
    }
}

// ============================================================================
// Matching
// ============================================================================

pub struct PresetSelection<'a> {
    /// Report order
    pub matched: Vec<(&'a ReportCluster, &'a EqPreset)>,
    /// Populated clusters with no preset in the catalog
    pub missing: Vec<&'a ReportCluster>,
}

pub fn match_presets<'a>(report: &'a ReportView, catalog: &'a Catalog) -> PresetSelection<'a> {
    let mut matched = Vec::new();
    let mut missing = Vec::new();
    for cluster in &report.clusters {
        match catalog.preset(&cluster.id) {
            Some(preset) => matched.push((cluster, preset)),
            None => missing.push(cluster),
        }
    }
    PresetSelection { matched, missing }
}

// ============================================================================
// Compact Form
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactBand {
    pub frequency: u32,
    pub gain: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactGains {
    pub global: i32,
    pub bands: Vec<CompactBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactPreset {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub gains: CompactGains,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompactCatalog {
    pub name: String,
    pub description: String,
    pub version: String,
    pub generated_at: String,
    pub presets: Vec<CompactPreset>,
}

pub fn compact_preset(preset: &EqPreset) -> CompactPreset {
    CompactPreset {
        id: preset.cluster_id.clone(),
        name: preset.name.clone(),
        is_default: false,
        gains: CompactGains {
            global: 0,
            bands: preset
                .bands
                .iter()
                .map(|(frequency, gain)| CompactBand { frequency, gain })
                .collect(),
        },
    }
}

pub fn build_compact(
    selection: &PresetSelection<'_>,
    catalog: &Catalog,
    generated_at: &str,
) -> CompactCatalog {
    CompactCatalog {
        name: CATALOG_NAME.to_string(),
        description: CATALOG_DESCRIPTION.to_string(),
        version: catalog.version().to_string(),
        generated_at: generated_at.to_string(),
        presets: selection
            .matched
            .iter()
            .map(|(_, preset)| compact_preset(preset))
            .collect(),
    }
}

// ============================================================================
// Detailed Form
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DetailedPreset {
    pub cluster_id: String,
    pub cluster_name: String,
    pub track_count: usize,
    pub preset_name: String,
    pub description: String,
    pub characteristics: Vec<String>,
    pub eq_settings: EqBands,
    pub sample_tracks: Vec<SampleTrack>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedCatalog {
    pub source: Value,
    pub total_tracks: Value,
    pub generated_at: String,
    pub presets: Vec<DetailedPreset>,
}

pub fn build_detailed(
    report: &ReportView,
    selection: &PresetSelection<'_>,
    generated_at: &str,
) -> DetailedCatalog {
    let presets = selection
        .matched
        .iter()
        .map(|(cluster, preset)| DetailedPreset {
            cluster_id: cluster.id.clone(),
            cluster_name: cluster.name.clone(),
            track_count: cluster.track_count,
            preset_name: preset.name.clone(),
            description: preset.description.clone(),
            characteristics: preset.characteristics.clone(),
            eq_settings: preset.bands,
            sample_tracks: cluster
                .sample_tracks
                .iter()
                .take(DETAILED_SAMPLE_TRACKS)
                .cloned()
                .collect(),
        })
        .collect();

    DetailedCatalog {
        source: report.source.clone(),
        total_tracks: report.total_tracks.clone(),
        generated_at: generated_at.to_string(),
        presets,
    }
}

// ============================================================================
// Summary Table
// ============================================================================

/// Up to three bands with |gain| >= 3 dB, lowest frequency first.
pub fn notable_adjustments(bands: &EqBands) -> String {
    let notable: Vec<String> = bands
        .iter()
        .filter(|(_, gain)| gain.abs() >= NOTABLE_GAIN_DB)
        .take(MAX_NOTABLE_BANDS)
        .map(|(freq, gain)| format!("{}Hz: {:+}dB", freq, gain))
        .collect();

    if notable.is_empty() {
        "Subtle adjustments".to_string()
    } else {
        notable.join(", ")
    }
}

pub fn summary_header() -> String {
    format!("{:<25} {:<10} {}", "Preset", "Tracks", "Key EQ Adjustments")
}

pub fn summary_row(detail: &DetailedPreset) -> String {
    format!(
        "{:<25} {:<10} {}",
        detail.preset_name,
        detail.track_count,
        notable_adjustments(&detail.eq_settings)
    )
}
