//! Built-in cluster and EQ preset catalog, version 1.0.
//!
//! Cluster order here is the declaration order used for every tie-break.
//! Keywords include Arabic-script variants and are matched as written.

use super::{CatalogSpec, ClusterDefinition, DurationHint, EqBands, EqPreset, ScoringPriors};
use crate::models::UNCATEGORIZED;

pub const BUILTIN_VERSION: &str = "1.0";

struct ClusterRow {
    id: &'static str,
    name: &'static str,
    keywords: &'static [&'static str],
    weight: f64,
    duration_hint: DurationHint,
}

struct PresetRow {
    cluster_id: &'static str,
    name: &'static str,
    description: &'static str,
    /// dB at 32, 64, 125, 250, 500, 1k, 2k, 4k, 8k, 16k Hz
    gains: [i32; 10],
    characteristics: &'static [&'static str],
}

// ============================================================================
// CLUSTER DEFINITIONS
// ============================================================================

const CLUSTERS: &[ClusterRow] = &[
    ClusterRow {
        id: "sufi_religious",
        name: "Sufi / Religious",
        keywords: &[
            "sufi", "sufism", "dhikr", "zikr", "ذكر", "صوفي", "إنشاد", "inshad",
            "qawwali", "nasheeds", "nasheed", "naat", "hamd", "allah", "الله",
            "prophet", "رسول", "نبي", "sheikh", "شيخ", "mawlid", "مولد",
            "hadra", "حضرة", "sama", "سماع", "whirling", "dervish", "درويش",
            "spiritual", "روحاني", "meditation", "تأمل", "prayer", "صلاة",
            "quran", "قرآن", "recitation", "تلاوة", "islamic", "إسلامي",
            "masjid", "mosque", "مسجد", "tawhid", "توحيد",
        ],
        weight: 1.5,
        duration_hint: DurationHint::Long,
    },
    ClusterRow {
        id: "arabic_classical",
        name: "Arabic Classical / Traditional",
        keywords: &[
            "classical", "كلاسيك", "tarab", "طرب", "oud", "عود", "qanun", "قانون",
            "ney", "ناي", "maqam", "مقام", "oriental", "شرقي", "arabic", "عربي",
            "egypt", "مصر", "lebanon", "لبنان", "syria", "سوريا", "umm kulthum",
            "أم كلثوم", "farid", "فريد", "abdel halim", "عبد الحليم", "traditional",
            "تراث", "heritage", "folkloric", "شعبي", "baladi", "بلدي", "saidi",
            "صعيدي", "levantine", "khaleeji", "خليجي", "gulf",
        ],
        weight: 1.3,
        duration_hint: DurationHint::Medium,
    },
    ClusterRow {
        id: "arabic_pop",
        name: "Arabic Pop / Modern",
        keywords: &[
            "pop", "بوب", "modern", "حديث", "amr diab", "عمرو دياب", "nancy",
            "نانسي", "elissa", "إليسا", "haifa", "هيفا", "rotana", "روتانا",
            "arabic pop", "عربي", "mashup", "remix عربي", "arab", "egypt pop",
            "lebanese", "لبناني",
        ],
        weight: 1.0,
        duration_hint: DurationHint::Short,
    },
    ClusterRow {
        id: "electronic_edm",
        name: "Electronic / EDM",
        keywords: &[
            "electronic", "edm", "house", "techno", "trance", "dubstep", "bass",
            "remix", "dj", "club", "dance", "beat", "drop", "synth", "synthesizer",
            "rave", "festival", "progressive", "deep house", "tech house",
            "minimal", "ambient electronic", "breakbeat", "drum and bass", "dnb",
            "future bass", "trap", "electro", "electronica",
        ],
        weight: 1.0,
        duration_hint: DurationHint::Medium,
    },
    ClusterRow {
        id: "instrumental",
        name: "Instrumental / Ambient",
        keywords: &[
            "instrumental", "piano", "guitar", "violin", "cello", "orchestra",
            "ambient", "relaxing", "meditation music", "sleep", "study",
            "concentration", "focus", "calm", "peaceful", "nature sounds",
            "acoustic", "solo", "no vocals", "cinematic", "soundtrack", "score",
            "film music", "epic", "strings", "woodwind", "brass",
        ],
        weight: 1.0,
        duration_hint: DurationHint::None,
    },
    ClusterRow {
        id: "world_fusion",
        name: "World Music / Fusion",
        keywords: &[
            "world", "fusion", "global", "ethnic", "tribal", "african", "indian",
            "persian", "turkish", "flamenco", "latin", "brazilian", "reggae",
            "dub", "world beat", "ethno", "multicultural", "cross-cultural",
            "traditional fusion", "contemporary world",
        ],
        weight: 0.9,
        duration_hint: DurationHint::None,
    },
    ClusterRow {
        id: "rock_alternative",
        name: "Rock / Alternative",
        keywords: &[
            "rock", "alternative", "indie", "metal", "punk", "grunge", "hard rock",
            "classic rock", "progressive rock", "post-rock", "shoegaze", "brit pop",
            "garage", "blues rock", "psychedelic", "stoner", "doom",
        ],
        weight: 0.8,
        duration_hint: DurationHint::None,
    },
    ClusterRow {
        id: "hip_hop_rap",
        name: "Hip-Hop / Rap",
        keywords: &[
            "hip hop", "hip-hop", "rap", "rapper", "beats", "flow", "rhyme",
            "mc", "emcee", "freestyle", "trap rap", "boom bap", "old school",
            "new school", "conscious", "gangsta", "drill", "mumble",
        ],
        weight: 0.8,
        duration_hint: DurationHint::None,
    },
];

// ============================================================================
// EQ PRESETS
// ============================================================================

const PRESETS: &[PresetRow] = &[
    PresetRow {
        cluster_id: "sufi_religious",
        name: "Sufi / Vocal Focus",
        description: "Optimized for spiritual vocals, Sufi music, and religious chanting. \
            Enhances mid-range clarity for vocals while reducing bass rumble.",
        gains: [-2, -1, 0, 1, 2, 3, 3, 2, 1, 0],
        characteristics: &[
            "Vocal-focused",
            "Enhanced mid-range",
            "Clear Arabic diction",
            "Reduced low-end rumble",
        ],
    },
    PresetRow {
        cluster_id: "arabic_classical",
        name: "Arabic Classical",
        description: "Tailored for traditional Arabic instruments like oud, qanun, and ney. \
            Balances the warm resonance of strings with clear high-end for intricate melodies.",
        gains: [0, 1, 2, 1, 1, 2, 2, 3, 2, 1],
        characteristics: &[
            "Oud resonance enhanced",
            "Clear ney/qanun",
            "Warm maqam tones",
            "Natural dynamics",
        ],
    },
    PresetRow {
        cluster_id: "arabic_pop",
        name: "Arabic Pop",
        description: "Modern Arabic pop with punchy bass, clear vocals, and crisp highs. \
            Suitable for contemporary Middle Eastern music.",
        gains: [2, 3, 1, 0, 1, 2, 2, 1, 1, 0],
        characteristics: &[
            "Punchy modern bass",
            "Clear Arabic vocals",
            "Radio-friendly",
            "Contemporary sound",
        ],
    },
    PresetRow {
        cluster_id: "electronic_edm",
        name: "Electronic / EDM",
        description: "Heavy bass, powerful sub-frequencies, and crisp highs for electronic \
            dance music. The drop hits harder.",
        gains: [6, 5, 3, 0, -1, 0, 1, 2, 2, 1],
        characteristics: &[
            "Massive sub-bass",
            "Powerful drops",
            "Clear synths",
            "Club-ready sound",
        ],
    },
    PresetRow {
        cluster_id: "instrumental",
        name: "Instrumental / Ambient",
        description: "Balanced and natural for acoustic instruments, piano, and ambient music. \
            Minimal coloration, maximum fidelity.",
        gains: [0, 1, 2, 1, 0, 1, 2, 3, 2, 1],
        characteristics: &[
            "Natural tonality",
            "Acoustic detail",
            "Wide soundstage",
            "Minimal coloration",
        ],
    },
    PresetRow {
        cluster_id: "world_fusion",
        name: "World / Fusion",
        description: "Versatile preset for world music with diverse instrumentation. \
            Balances ethnic instruments with modern production.",
        gains: [1, 2, 1, 1, 1, 2, 2, 2, 1, 1],
        characteristics: &[
            "Balanced across genres",
            "Ethnic instrument clarity",
            "Modern production support",
            "Versatile",
        ],
    },
    PresetRow {
        cluster_id: "rock_alternative",
        name: "Rock / Alternative",
        description: "Guitar-focused with punchy drums and clear vocals. \
            Cuts through the mix without being harsh.",
        gains: [1, 3, 2, 1, 0, 2, 3, 2, 1, 0],
        characteristics: &[
            "Guitar-forward",
            "Punchy drums",
            "Clear vocals",
            "Energy without harshness",
        ],
    },
    PresetRow {
        cluster_id: "hip_hop_rap",
        name: "Hip-Hop / Rap",
        description: "Deep bass, clear vocals, and crisp hi-hats. Optimized for beats and flow.",
        gains: [5, 4, 2, 0, 1, 2, 2, 1, 2, 1],
        characteristics: &[
            "Deep 808 bass",
            "Clear vocal flow",
            "Crisp hi-hats",
            "Beat-focused",
        ],
    },
    PresetRow {
        cluster_id: UNCATEGORIZED,
        name: "Flat / Reference",
        description: "Neutral preset with minimal adjustment. \
            Use when track type is unknown or for reference listening.",
        gains: [0; 10],
        characteristics: &[
            "Flat response",
            "Reference quality",
            "No coloration",
            "True to source",
        ],
    },
];

/// Prior targets for catalog 1.0. The Arabic-script and duration bonuses are
/// a domain judgement tied to these five ids; a new catalog version has to
/// name its own targets rather than infer them.
fn priors() -> ScoringPriors {
    ScoringPriors {
        spiritual: "sufi_religious".to_string(),
        classical: "arabic_classical".to_string(),
        modern_pop: "arabic_pop".to_string(),
        electronic: "electronic_edm".to_string(),
        rap: "hip_hop_rap".to_string(),
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn spec() -> CatalogSpec {
    let clusters = CLUSTERS
        .iter()
        .map(|row| ClusterDefinition {
            id: row.id.to_string(),
            name: row.name.to_string(),
            keywords: to_strings(row.keywords),
            weight: row.weight,
            duration_hint: row.duration_hint,
        })
        .collect();

    let presets = PRESETS
        .iter()
        .map(|row| EqPreset {
            cluster_id: row.cluster_id.to_string(),
            name: row.name.to_string(),
            description: row.description.to_string(),
            bands: EqBands::new(row.gains),
            characteristics: to_strings(row.characteristics),
        })
        .collect();

    CatalogSpec {
        version: BUILTIN_VERSION.to_string(),
        clusters,
        presets,
        priors: priors(),
    }
}
