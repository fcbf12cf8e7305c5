// ExifTool wrapper: date backfill, date-based renaming and tag copying

use std::path::Path;
use std::process::{Command, Output};
use regex::Regex;

use crate::constants::{BACKFILL_EXTENSIONS, ORGANIZE_DATE_FORMAT, ORGANIZE_FILENAME_TEMPLATE};
use crate::error::{ImportrrError, Result};

/// Fill in DateTimeOriginal from CreateDate on movie files that lack it.
pub fn backfill_videos(exiftool: &Path, work_dir: &Path, base_dir: &Path) -> Result<()> {
    log::info!("Updating the movie files");

    let mut cmd = Command::new(exiftool);
    cmd.current_dir(base_dir)
        .args(["-overwrite_original", "-datetimeoriginal<CreateDate", "-if", "not $datetimeoriginal"]);
    for ext in BACKFILL_EXTENSIONS {
        cmd.args(["-ext", ext]);
    }
    cmd.arg(work_dir);

    let output = run(&mut cmd)?;
    check_exit(&output)?;
    Ok(())
}

/// Rename every file in `work_dir` into `<base_dir>/YYYY/MM/<capture time>.<ext>`.
/// Returns the verbose report; destinations in it are relative to `base_dir`.
pub fn organize(exiftool: &Path, work_dir: &Path, base_dir: &Path) -> Result<String> {
    log::info!("Renaming and sorting the files");

    let mut cmd = Command::new(exiftool);
    cmd.current_dir(base_dir)
        .args(["-verbose", ORGANIZE_FILENAME_TEMPLATE, "-d", ORGANIZE_DATE_FORMAT])
        .arg(work_dir);

    let output = run(&mut cmd)?;
    check_exit(&output)?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Copy every tag from `source` onto `output` in place.
pub fn copy_tags(exiftool: &Path, source: &Path, output: &Path) -> Result<()> {
    log::debug!("Copying tags {} -> {}", source.display(), output.display());

    let mut cmd = Command::new(exiftool);
    cmd.args(["-overwrite_original", "-TagsFromFile"])
        .arg(source)
        .arg("-all:all")
        .arg(output);

    let output = run(&mut cmd)?;
    if !output.status.success() {
        return Err(ImportrrError::ExifTool(format!(
            "tag copy failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn run(cmd: &mut Command) -> Result<Output> {
    log::debug!("ExifTool command: {:?}", cmd);
    cmd.output()
        .map_err(|e| ImportrrError::ExifTool(format!("Failed to run exiftool: {}", e)))
}

fn check_exit(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let code = output.status.code().unwrap_or(-1);
    if is_tolerated_failure(&stdout) {
        log::warn!("exiftool exited with {} after filtering some files; continuing", code);
        return Ok(());
    }

    Err(ImportrrError::ExifTool(format!(
        "exiftool exited with {}: {}",
        code,
        String::from_utf8_lossy(&output.stderr).trim()
    )))
}

/// A non-zero exit is only acceptable when exiftool did read files and some of
/// them were filtered out or left untouched.
pub fn is_tolerated_failure(stdout: &str) -> bool {
    if stdout.trim().is_empty() {
        return false;
    }
    let nothing_read = Regex::new(r"(?m)^\s*0 image files read")
        .map(|re| re.is_match(stdout))
        .unwrap_or(false);
    !nothing_read
}
