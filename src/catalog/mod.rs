//! Cluster and EQ preset catalog.
//!
//! The catalog is built once at startup, validated, and then passed by
//! reference to the classifiers, the aggregator and the preset generator.
//! Cluster order is significant: every tie-break falls back to it.

mod builtin;

pub use builtin::BUILTIN_VERSION;

use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::models::UNCATEGORIZED;

/// The fixed 10-band equalizer, ascending.
pub const EQ_FREQUENCIES: [u32; 10] = [32, 64, 125, 250, 500, 1000, 2000, 4000, 8000, 16000];

// ============================================================================
// Errors
// ============================================================================

/// Catalog misconfiguration. Any of these stops a run before output is written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("cluster #{position} has an empty id")]
    EmptyClusterId { position: usize },

    #[error("cluster id '{0}' is declared more than once")]
    DuplicateClusterId(String),

    #[error("cluster id '{0}' is reserved for the fallback cluster")]
    ReservedClusterId(String),

    #[error("cluster '{id}' has invalid weight {weight} (must be finite and > 0)")]
    InvalidWeight { id: String, weight: f64 },

    #[error("cluster '{0}' has an empty keyword")]
    EmptyKeyword(String),

    #[error("preset for '{0}' is declared more than once")]
    DuplicatePresetId(String),

    #[error("preset '{0}' does not belong to any declared cluster")]
    UnknownPresetCluster(String),

    #[error("no preset for 'uncategorized'; a flat fallback preset is required")]
    MissingFallbackPreset,

    #[error("the 'uncategorized' preset must be flat (all bands 0 dB)")]
    FallbackNotFlat,

    #[error("scoring prior '{role}' names unknown cluster '{id}'")]
    UnknownPriorTarget { role: &'static str, id: String },

    #[error("EQ bands must be exactly {expected:?} Hz, got {found:?}")]
    InvalidBands { expected: Vec<u32>, found: Vec<u32> },
}

// ============================================================================
// Cluster Definitions
// ============================================================================

/// Qualitative length hint. Informational; scoring uses the duration priors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationHint {
    Short,
    Medium,
    Long,
    #[default]
    None,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDefinition {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub duration_hint: DurationHint,
}

/// Cluster ids that receive the fixed Arabic-script and duration bonuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPriors {
    pub spiritual: String,
    pub classical: String,
    pub modern_pop: String,
    pub electronic: String,
    pub rap: String,
}

/// Scoring priors resolved to catalog positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorTargets {
    pub spiritual: usize,
    pub classical: usize,
    pub modern_pop: usize,
    pub electronic: usize,
    pub rap: usize,
}

// ============================================================================
// EQ Presets
// ============================================================================

/// Gains in dB, one per entry of [`EQ_FREQUENCIES`].
///
/// Serialized as `{"32": g, "64": g, ...}` in ascending frequency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<u32, i32>")]
pub struct EqBands([i32; 10]);

impl EqBands {
    pub const FLAT: EqBands = EqBands([0; 10]);

    pub fn new(gains: [i32; 10]) -> Self {
        Self(gains)
    }

    pub fn gains(&self) -> &[i32; 10] {
        &self.0
    }

    pub fn is_flat(&self) -> bool {
        *self == Self::FLAT
    }

    /// (frequency, gain) pairs, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (u32, i32)> + '_ {
        EQ_FREQUENCIES.iter().copied().zip(self.0.iter().copied())
    }
}

impl TryFrom<BTreeMap<u32, i32>> for EqBands {
    type Error = CatalogError;

    fn try_from(bands: BTreeMap<u32, i32>) -> Result<Self, Self::Error> {
        let found: Vec<u32> = bands.keys().copied().collect();
        if found != EQ_FREQUENCIES {
            return Err(CatalogError::InvalidBands {
                expected: EQ_FREQUENCIES.to_vec(),
                found,
            });
        }
        let mut gains = [0; 10];
        for (slot, gain) in gains.iter_mut().zip(bands.values()) {
            *slot = *gain;
        }
        Ok(Self(gains))
    }
}

impl Serialize for EqBands {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EQ_FREQUENCIES.len()))?;
        for (freq, gain) in self.iter() {
            map.serialize_entry(&freq, &gain)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqPreset {
    pub cluster_id: String,
    pub name: String,
    pub description: String,
    pub bands: EqBands,
    #[serde(default)]
    pub characteristics: Vec<String>,
}

// ============================================================================
// Catalog
// ============================================================================

/// Unvalidated catalog contents, as declared in code or read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub version: String,
    pub clusters: Vec<ClusterDefinition>,
    pub presets: Vec<EqPreset>,
    pub priors: ScoringPriors,
}

/// Validated, read-only catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    clusters: Vec<ClusterDefinition>,
    presets: Vec<EqPreset>,
    priors: ScoringPriors,
    targets: PriorTargets,
    cluster_index: FxHashMap<String, usize>,
    preset_index: FxHashMap<String, usize>,
    flat_preset: usize,
}

impl Catalog {
    /// Validate a catalog spec. Keywords are lower-cased and de-duplicated
    /// (first occurrence kept) so matching never has to do it per track.
    pub fn new(spec: CatalogSpec) -> Result<Self, CatalogError> {
        let mut clusters = spec.clusters;
        let mut cluster_index = FxHashMap::default();

        for (position, cluster) in clusters.iter_mut().enumerate() {
            if cluster.id.is_empty() {
                return Err(CatalogError::EmptyClusterId { position });
            }
            if cluster.id == UNCATEGORIZED {
                return Err(CatalogError::ReservedClusterId(cluster.id.clone()));
            }
            if cluster_index.insert(cluster.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateClusterId(cluster.id.clone()));
            }
            if !cluster.weight.is_finite() || cluster.weight <= 0.0 {
                return Err(CatalogError::InvalidWeight {
                    id: cluster.id.clone(),
                    weight: cluster.weight,
                });
            }
            if cluster.keywords.iter().any(|k| k.is_empty()) {
                return Err(CatalogError::EmptyKeyword(cluster.id.clone()));
            }

            let mut seen = FxHashSet::default();
            cluster.keywords = std::mem::take(&mut cluster.keywords)
                .into_iter()
                .map(|k| k.to_lowercase())
                .filter(|k| seen.insert(k.clone()))
                .collect();
        }

        let mut preset_index = FxHashMap::default();
        for (position, preset) in spec.presets.iter().enumerate() {
            if preset.cluster_id != UNCATEGORIZED
                && !cluster_index.contains_key(&preset.cluster_id)
            {
                return Err(CatalogError::UnknownPresetCluster(preset.cluster_id.clone()));
            }
            if preset_index.insert(preset.cluster_id.clone(), position).is_some() {
                return Err(CatalogError::DuplicatePresetId(preset.cluster_id.clone()));
            }
        }

        let flat_preset = *preset_index
            .get(UNCATEGORIZED)
            .ok_or(CatalogError::MissingFallbackPreset)?;
        if !spec.presets[flat_preset].bands.is_flat() {
            return Err(CatalogError::FallbackNotFlat);
        }

        let resolve = |role: &'static str, id: &str| {
            cluster_index
                .get(id)
                .copied()
                .ok_or_else(|| CatalogError::UnknownPriorTarget {
                    role,
                    id: id.to_string(),
                })
        };
        let targets = PriorTargets {
            spiritual: resolve("spiritual", &spec.priors.spiritual)?,
            classical: resolve("classical", &spec.priors.classical)?,
            modern_pop: resolve("modern_pop", &spec.priors.modern_pop)?,
            electronic: resolve("electronic", &spec.priors.electronic)?,
            rap: resolve("rap", &spec.priors.rap)?,
        };

        Ok(Self {
            version: spec.version,
            clusters,
            presets: spec.presets,
            priors: spec.priors,
            targets,
            cluster_index,
            preset_index,
            flat_preset,
        })
    }

    /// The catalog compiled into this crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin::spec())
    }

    /// Load and validate a JSON catalog file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let spec: CatalogSpec = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse catalog file {}", path.display()))?;
        Self::new(spec).with_context(|| format!("Invalid catalog in {}", path.display()))
    }

    /// Built-in catalog, or the one in `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::builtin()?),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn clusters(&self) -> &[ClusterDefinition] {
        &self.clusters
    }

    pub fn priors(&self) -> &ScoringPriors {
        &self.priors
    }

    pub fn targets(&self) -> PriorTargets {
        self.targets
    }

    pub fn position(&self, cluster_id: &str) -> Option<usize> {
        self.cluster_index.get(cluster_id).copied()
    }

    pub fn cluster(&self, cluster_id: &str) -> Option<&ClusterDefinition> {
        self.position(cluster_id).map(|i| &self.clusters[i])
    }

    /// Declared clusters plus the fallback cluster.
    pub fn is_registered(&self, cluster_id: &str) -> bool {
        cluster_id == UNCATEGORIZED || self.cluster_index.contains_key(cluster_id)
    }

    /// Declaration-order rank for tie-breaks. The fallback cluster, and any id
    /// the catalog doesn't know, rank after every declared cluster.
    pub fn rank(&self, cluster_id: &str) -> usize {
        self.position(cluster_id).unwrap_or(self.clusters.len())
    }

    /// Display name: the declared name, else the id title-cased.
    pub fn cluster_name(&self, cluster_id: &str) -> String {
        match self.cluster(cluster_id) {
            Some(cluster) => cluster.name.clone(),
            None => title_case_id(cluster_id),
        }
    }

    pub fn presets(&self) -> &[EqPreset] {
        &self.presets
    }

    pub fn preset(&self, cluster_id: &str) -> Option<&EqPreset> {
        self.preset_index.get(cluster_id).map(|&i| &self.presets[i])
    }

    /// Preset for a cluster, falling back to the flat `uncategorized` preset.
    pub fn preset_or_flat(&self, cluster_id: &str) -> &EqPreset {
        self.preset(cluster_id)
            .unwrap_or(&self.presets[self.flat_preset])
    }
}

/// "hip_hop_rap" -> "Hip Hop Rap"
fn title_case_id(id: &str) -> String {
    id.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
