//! Artifact location and collection.
//!
//! The generation agent is told where to write its files, but its output
//! location is not perfectly predictable. After the agent exits we check a
//! short list of likely directories, then fall back to a bounded-depth scan
//! of the workspace. A scanned directory is accepted only when it contains
//! the complete expected set; partial matches are never promoted.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::paths::WORKSPACE_OUTPUT_DIR;

/// Files every candidate must produce.
pub const EXPECTED_FILES: &[&str] = &["tool.py", "manifest.json", "smoke_test.py"];

/// Maximum directory depth for the fallback scan.
const MAX_SCAN_DEPTH: usize = 6;

/// Directories never descended into during the scan.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Where a candidate's artifacts were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Directory containing the complete expected file set.
    Found(PathBuf),
    NotFound,
}

impl ArtifactSource {
    pub fn describe(&self) -> String {
        match self {
            ArtifactSource::Found(dir) => dir.display().to_string(),
            ArtifactSource::NotFound => "not-found".to_string(),
        }
    }
}

/// Locate the agent's output and copy the expected files into the
/// candidate's stable output directory.
pub fn sync_candidate_artifacts(
    output_dir: &Path,
    workspace_dir: &Path,
    job_id: &str,
    candidate_id: &str,
) -> std::io::Result<ArtifactSource> {
    std::fs::create_dir_all(output_dir)?;

    let direct_candidates = [
        output_dir.to_path_buf(),
        workspace_dir.join(WORKSPACE_OUTPUT_DIR),
        workspace_dir
            .join(".toolforge")
            .join("jobs")
            .join(job_id)
            .join(candidate_id)
            .join("output"),
        workspace_dir.join("output"),
    ];

    for source in &direct_candidates {
        if directory_has_expected_files(source) {
            copy_expected_files(source, output_dir)?;
            return Ok(ArtifactSource::Found(source.clone()));
        }
    }

    if let Some(scanned) = find_likely_artifact_dir(workspace_dir) {
        debug!(dir = %scanned.display(), "artifact scan located output directory");
        copy_expected_files(&scanned, output_dir)?;
        return Ok(ArtifactSource::Found(scanned));
    }

    Ok(ArtifactSource::NotFound)
}

fn directory_has_expected_files(dir: &Path) -> bool {
    dir.is_dir() && EXPECTED_FILES.iter().all(|file| dir.join(file).is_file())
}

fn copy_expected_files(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;
    for file in EXPECTED_FILES {
        let from = source.join(file);
        let to = destination.join(file);
        if from != to {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

/// Bounded-depth scan scoring each directory by how many expected files it
/// contains. Returns the best-scoring directory only when it holds the
/// complete set.
fn find_likely_artifact_dir(root: &Path) -> Option<PathBuf> {
    let mut best: Option<(PathBuf, usize)> = None;

    let walker = WalkDir::new(root)
        .max_depth(MAX_SCAN_DEPTH)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !SKIPPED_DIRS.contains(&name))
                .unwrap_or(true)
        });

    for entry in walker.flatten() {
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        let matched = EXPECTED_FILES
            .iter()
            .filter(|file| dir.join(file).is_file())
            .count();
        if matched > 0 && best.as_ref().map(|(_, m)| matched > *m).unwrap_or(true) {
            best = Some((dir.to_path_buf(), matched));
        }
    }

    best.and_then(|(dir, matched)| (matched == EXPECTED_FILES.len()).then_some(dir))
}
