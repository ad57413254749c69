//! Generate EQ preset catalogs from a cluster report.
//!
//! Writes a compact device-facing catalog and a detailed audit catalog, then
//! prints a summary table of the presets produced.

use anyhow::{bail, Context, Result};
use autoeq_cluster::catalog::Catalog;
use autoeq_cluster::models::{to_json_document, write_documents};
use autoeq_cluster::presets::{
    build_compact, build_detailed, match_presets, summary_header, summary_row, ReportView,
};
use autoeq_cluster::progress::{self, create_spinner, finish_phase};
use autoeq_cluster::safety::{validate_output_path, PRESETS_PATTERN};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};

const DEFAULT_COMPACT_NAME: &str = "eq_presets.json";
const DEFAULT_DETAILED_NAME: &str = "eq_presets_detailed.json";

#[derive(Parser)]
#[command(name = "generate-eq-presets")]
#[command(about = "Generate EQ preset catalogs from a cluster report")]
struct Args {
    /// Cluster report written by cluster-tracks
    input: PathBuf,

    /// Compact preset catalog (default: eq_presets.json next to INPUT)
    #[arg(long)]
    compact: Option<PathBuf>,

    /// Detailed preset catalog (default: eq_presets_detailed.json next to INPUT)
    #[arg(long)]
    detailed: Option<PathBuf>,

    /// JSON catalog replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Hide spinners and print plain progress lines
    #[arg(long)]
    log_only: bool,
}

fn next_to(input: &Path, name: &str) -> PathBuf {
    input.with_file_name(name)
}

fn main() -> Result<()> {
    let args = Args::parse();
    progress::set_log_only(args.log_only);

    println!("{:=<60}", "");
    println!("EQ Preset Generator");
    println!("{:=<60}", "");

    let compact_path = args
        .compact
        .clone()
        .unwrap_or_else(|| next_to(&args.input, DEFAULT_COMPACT_NAME));
    let detailed_path = args
        .detailed
        .clone()
        .unwrap_or_else(|| next_to(&args.input, DEFAULT_DETAILED_NAME));

    if compact_path == detailed_path {
        bail!(
            "Compact and detailed outputs are the same file: {}",
            compact_path.display()
        );
    }
    let mut inputs: Vec<&Path> = vec![args.input.as_path()];
    inputs.extend(args.catalog.as_deref());
    validate_output_path(&compact_path, PRESETS_PATTERN, &inputs)?;
    validate_output_path(&detailed_path, PRESETS_PATTERN, &inputs)?;

    let catalog = Catalog::load(args.catalog.as_deref())?;

    let spinner = create_spinner("Reading cluster report");
    let report = ReportView::from_json_file(&args.input)
        .context("Run cluster-tracks first to produce a cluster report")?;
    finish_phase(&spinner, format!("Loaded {} clusters", report.clusters.len()));

    let selection = match_presets(&report, &catalog);
    for cluster in &selection.missing {
        progress::warn(format!(
            "cluster '{}' ({} tracks) has no EQ preset in catalog {}; skipped",
            cluster.id,
            cluster.track_count,
            catalog.version()
        ));
    }
    for (cluster, preset) in &selection.matched {
        println!("  Generated preset: {} ({} tracks)", preset.name, cluster.track_count);
    }

    let generated_at = Local::now().to_rfc3339();

    let compact = build_compact(&selection, &catalog, &generated_at);
    let detailed = build_detailed(&report, &selection, &generated_at);
    write_documents(&[
        (compact_path.as_path(), to_json_document(&compact)?),
        (detailed_path.as_path(), to_json_document(&detailed)?),
    ])?;
    println!("\nCompact presets saved to: {}", compact_path.display());
    println!("Detailed presets saved to: {}", detailed_path.display());

    println!("\n{:=<60}", "");
    println!("EQ Presets Summary");
    println!("{:=<60}", "");
    println!("{}", summary_header());
    println!("{:-<60}", "");
    for detail in &detailed.presets {
        println!("{}", summary_row(detail));
    }

    Ok(())
}
