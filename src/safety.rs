//! Output path checks, run before any artifact is written.
//!
//! A bad argument order (`cluster-tracks out.json likes.json`) must not
//! overwrite the track dump or the cluster report it was built from.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// File name fragments that mark a raw track dump
const INPUT_DUMP_PATTERNS: [&str; 1] = ["likes"];

/// Cluster report file names must contain this
pub const CLUSTERS_PATTERN: &str = "clusters";

/// Preset catalog file names must contain this
pub const PRESETS_PATTERN: &str = "presets";

fn resolved(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output file name contains `required_pattern` (e.g. "clusters", "presets")
/// - Output file name doesn't look like a raw track dump
/// - Output is not any of `input_paths`, also after resolving symlinks
pub fn validate_output_path(
    output: &Path,
    required_pattern: &str,
    input_paths: &[&Path],
) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    for pattern in INPUT_DUMP_PATTERNS {
        if output_name.contains(pattern) {
            bail!(
                "Safety check failed: output '{}' looks like a track dump ('{}' in the name)",
                output.display(),
                pattern
            );
        }
    }

    let output_resolved = resolved(output);
    for input in input_paths {
        if output == *input || output_resolved == resolved(input) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                input.display()
            );
        }
    }

    Ok(())
}
