use anyhow::{Context, Result};
use autoeq_cluster::aggregate::build_report;
use autoeq_cluster::catalog::Catalog;
use autoeq_cluster::models::{
    split_records, write_json_file, ClassifiedTrack, ClusterReport, ClusteringStats, Track,
    TrackDump, UNCATEGORIZED,
};
use autoeq_cluster::normalize::{normalize_track_text, resolve_duration_ms};
use autoeq_cluster::progress::{self, create_progress_bar, create_spinner, finish_phase};
use autoeq_cluster::safety::{validate_output_path, CLUSTERS_PATTERN};
use autoeq_cluster::scoring::{classify_tracks, Classifier, ExternalClassifier, KeywordClassifier};
use chrono::Local;
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "cluster-tracks")]
#[command(about = "Cluster track metadata into listening styles for EQ presets")]
struct Args {
    /// Track dump JSON: {"source": ..., "tracks": [...]}
    input: PathBuf,

    /// Cluster report to write (file name must contain "clusters")
    output: PathBuf,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// JSON catalog replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Replay assignments from an externally produced cluster report
    #[arg(long)]
    external_clusters: Option<PathBuf>,

    /// Print the score breakdown of tracks whose title contains this text
    #[arg(long)]
    explain: Option<String>,

    /// Write run statistics JSON to this file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide progress bars and print tail-friendly progress lines
    #[arg(long)]
    log_only: bool,
}

fn read_tracks(
    path: &Path,
    stats: &mut ClusteringStats,
) -> Result<(serde_json::Value, Vec<Track>)> {
    let spinner = create_spinner("Phase 1: Reading track dump");
    let dump = TrackDump::from_json_file(path)?;
    stats.records_read = dump.tracks.len();

    let (tracks, skipped) = split_records(dump.tracks);
    for position in &skipped {
        progress::warn(format!("track record #{} is not a JSON object; skipped", position));
    }
    stats.records_skipped = skipped.len();

    finish_phase(&spinner, format!("Phase 1: Read {} tracks", tracks.len()));
    Ok((dump.source, tracks))
}

fn count_signals(tracks: &[Track], stats: &mut ClusteringStats) {
    stats.arabic_script_tracks = tracks
        .par_iter()
        .filter(|t| normalize_track_text(t).has_arabic)
        .count();
    stats.unknown_duration_tracks = tracks
        .par_iter()
        .filter(|t| resolve_duration_ms(t).is_none())
        .count();
}

fn explain(
    classified: &[ClassifiedTrack],
    classifier: &dyn Classifier,
    catalog: &Catalog,
    query: &str,
) {
    let needle = query.to_lowercase();
    println!("\nScore breakdown for '{}' ({} classifier):", query, classifier.name());
    println!("{:-<80}", "");

    let mut found = 0;
    for c in classified {
        let Some(title) = c.track.title() else { continue };
        if !title.to_lowercase().contains(&needle) {
            continue;
        }
        found += 1;
        println!(
            "{} - {} -> {} ({:.2})",
            title,
            c.track.artist().unwrap_or("?"),
            c.cluster_id,
            c.cluster_score
        );
        for contribution in classifier.evidence(&c.track) {
            println!(
                "    {:+.2}  {:<20} {}",
                contribution.amount,
                catalog.clusters()[contribution.cluster].id,
                contribution.source
            );
        }
    }

    if found == 0 {
        println!("No matching tracks.");
    }
}

fn print_summary(report: &ClusterReport) {
    println!("\n{:=<60}", "");
    println!("Clustering complete!");
    println!("{:=<60}", "");
    for cluster in &report.clusters {
        println!(
            "  {}: {} tracks from {} artists",
            cluster.name, cluster.track_count, cluster.unique_artists
        );
    }

    println!("\nSummary:");
    for cluster in &report.clusters {
        let pct = if report.total_tracks == 0 {
            0.0
        } else {
            100.0 * cluster.track_count as f64 / report.total_tracks as f64
        };
        println!("  {}: {} tracks ({:.1}%)", cluster.name, cluster.track_count, pct);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    progress::set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();

    let mut inputs: Vec<&Path> = vec![args.input.as_path()];
    inputs.extend(args.catalog.as_deref());
    inputs.extend(args.external_clusters.as_deref());
    validate_output_path(&args.output, CLUSTERS_PATTERN, &inputs)?;

    let catalog = Catalog::load(args.catalog.as_deref())?;
    println!(
        "Catalog {}: {} clusters, {} presets",
        catalog.version(),
        catalog.clusters().len(),
        catalog.presets().len()
    );

    let mut stats = ClusteringStats::default();
    let (source, tracks) = read_tracks(&args.input, &mut stats)?;

    let classifier: Box<dyn Classifier + '_> = match &args.external_clusters {
        Some(path) => {
            let external = ExternalClassifier::from_json_file(path, &catalog)?;
            println!("Loaded {} external assignments from {:?}", external.len(), path);
            let unregistered = external.unregistered_clusters();
            if !unregistered.is_empty() {
                progress::warn(format!(
                    "{} external cluster id(s) not in catalog, tracks go to uncategorized: {}",
                    unregistered.len(),
                    unregistered.join(", ")
                ));
            }
            Box::new(external)
        }
        None => Box::new(KeywordClassifier::new(&catalog)),
    };
    stats.classifier = classifier.name().to_string();

    count_signals(&tracks, &mut stats);

    let pb = create_progress_bar(tracks.len() as u64, "Phase 2: Classifying");
    let classified = classify_tracks(tracks, classifier.as_ref(), &pb);
    stats.tracks_classified = classified.len();
    stats.uncategorized = classified
        .iter()
        .filter(|c| c.cluster_id == UNCATEGORIZED)
        .count();
    finish_phase(
        &pb,
        format!(
            "Phase 2: Classified {} tracks ({} uncategorized)",
            stats.tracks_classified, stats.uncategorized
        ),
    );

    if let Some(query) = &args.explain {
        explain(&classified, classifier.as_ref(), &catalog, query);
    }

    let report = build_report(source, classified, &catalog, Local::now().to_rfc3339());
    stats.clusters_populated = report.cluster_count;

    let spinner = create_spinner("Phase 3: Writing cluster report");
    write_json_file(&args.output, &report)?;
    finish_phase(&spinner, format!("Phase 3: Wrote {:?}", args.output));

    print_summary(&report);

    let elapsed = start.elapsed();
    stats.elapsed_seconds = elapsed.as_secs_f64();
    println!("\nElapsed: {}", progress::format_elapsed(elapsed));

    stats.log_phase("clustering");
    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }

    Ok(())
}
