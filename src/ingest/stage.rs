// Stager: moves settled files into the per-run work directory and retires it afterwards

use std::fs;
use std::path::{Path, PathBuf};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{ImportrrError, Result};

/// What happened to each candidate during staging.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageReport {
    /// Set only when the work directory exists (created or reused).
    pub work_dir: Option<PathBuf>,
    pub moved: Vec<String>,
    /// Already present in the work directory; left where they were.
    pub skipped: Vec<String>,
    pub failed: Vec<StageFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub file: String,
    pub error: String,
}

/// Move `names` from `source_dir` into `work_dir` with a rename each.
///
/// An empty candidate list never creates the work directory. An existing work
/// directory (left behind by an interrupted run) is reused. A name collision
/// inside the work directory skips that file; a failed rename is recorded and
/// the remaining files are still attempted.
pub fn stage_files(source_dir: &Path, work_dir: &Path, names: &[String]) -> Result<StageReport> {
    let mut report = StageReport::default();

    if names.is_empty() {
        log::debug!("No files to move, skipping work directory creation");
        return Ok(report);
    }

    if work_dir.exists() {
        if !work_dir.is_dir() {
            return Err(ImportrrError::NotADirectory(work_dir.to_path_buf()));
        }
        log::warn!("Work directory already exists, using existing: {}", work_dir.display());
    } else {
        log::debug!("Creating work directory: {}", work_dir.display());
        fs::create_dir(work_dir)?;
    }
    report.work_dir = Some(work_dir.to_path_buf());

    for name in names {
        let from = source_dir.join(name);
        let to = work_dir.join(name);

        if fs::symlink_metadata(&to).is_ok() {
            log::warn!("Target file already exists, skipping: {}", name);
            report.skipped.push(name.clone());
            continue;
        }

        match fs::rename(&from, &to) {
            Ok(()) => {
                log::debug!("Moved file: {}", name);
                report.moved.push(name.clone());
            }
            Err(e) => {
                log::warn!("Failed to move {} into {}: {}", name, work_dir.display(), e);
                report.failed.push(StageFailure {
                    file: name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Moved {} of {} files to {}",
        report.moved.len(),
        names.len(),
        work_dir.display()
    );
    Ok(report)
}

/// Entries still inside the work directory, as paths relative to it.
pub fn list_leftovers(work_dir: &Path) -> Vec<String> {
    let mut leftovers: Vec<String> = WalkDir::new(work_dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Cannot list leftover in {}: {}", work_dir.display(), err);
                None
            }
        })
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(work_dir)
                .ok()
                .map(|p| p.to_string_lossy().to_string())
        })
        .collect();
    leftovers.sort();
    leftovers
}

/// Final state of a work directory after the organize step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum WorkDirOutcome {
    Removed,
    /// The organizer could not relocate these entries; they stay for manual follow-up.
    Preserved(Vec<String>),
    RemoveFailed(String),
    Missing,
}

/// Remove the work directory if and only if it is empty.
pub fn finish_work_dir(work_dir: &Path) -> WorkDirOutcome {
    if !work_dir.is_dir() {
        return WorkDirOutcome::Missing;
    }

    let leftovers = list_leftovers(work_dir);
    if !leftovers.is_empty() {
        log::warn!(
            "Unable to process {} files - they remain in {}",
            leftovers.len(),
            work_dir.display()
        );
        log::debug!("Remaining files: {:?}", leftovers);
        return WorkDirOutcome::Preserved(leftovers);
    }

    log::debug!("Removing temporary directory: {}", work_dir.display());
    match fs::remove_dir(work_dir) {
        Ok(()) => WorkDirOutcome::Removed,
        Err(e) => {
            log::error!("Failed to remove directory {}: {}", work_dir.display(), e);
            WorkDirOutcome::RemoveFailed(e.to_string())
        }
    }
}
