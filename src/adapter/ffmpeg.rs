// Raw video normalization via ffmpeg
//
// Encodes into a temp file next to the target; only a successful encode is
// renamed to the final name.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::adapter::{exiftool, free_normalized_name, normalized_name};
use crate::constants::FFMPEG_PARAMS;
use crate::error::{ImportrrError, Result};

/// Convert `source` (relative to `base_dir`) and return the relative path of
/// the normalized file, or `None` when anything went wrong. An existing file
/// at the normalized name is never replaced.
pub fn convert(ffmpeg: &Path, exiftool_bin: &Path, base_dir: &Path, source: &str) -> Option<String> {
    let plain = normalized_name(source)?;

    let input_file = base_dir.join(source);
    if !input_file.exists() {
        log::error!("Input file does not exist: {}", input_file.display());
        return None;
    }

    let Some(result) = free_normalized_name(base_dir, source) else {
        log::warn!("No free name left for the conversion of {}, skipping", source);
        return None;
    };
    if result != plain {
        log::warn!("{} already exists, converting {} to {} instead", plain, source, result);
    }
    log::info!("Converting {} to {}", source, result);
    let output_file = base_dir.join(&result);

    let converted = transcode(ffmpeg, &input_file, &output_file)
        .and_then(|_| exiftool::copy_tags(exiftool_bin, &input_file, &output_file));

    match converted {
        Ok(()) => {
            let input_size = fs::metadata(&input_file).map(|m| m.len()).unwrap_or(0);
            let output_size = fs::metadata(&output_file).map(|m| m.len()).unwrap_or(0);
            log::info!(
                "Conversion successful: {} ({} bytes) -> {} ({} bytes)",
                source, input_size, result, output_size
            );
            Some(result)
        }
        Err(e) => {
            log::error!("Failed to convert {}: {}", source, e);
            None
        }
    }
}

/// Run ffmpeg with the archival encoding parameters.
pub fn transcode(ffmpeg: &Path, input_file: &Path, output_file: &Path) -> Result<()> {
    let tmp_path = output_file.with_extension("tmp.mp4");

    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-y")
        .arg("-i")
        .arg(input_file)
        .args(FFMPEG_PARAMS)
        .arg(&tmp_path);
    log::debug!("FFmpeg command: {:?}", cmd);

    let output = cmd
        .output()
        .map_err(|e| ImportrrError::FFmpeg(format!("Failed to run ffmpeg: {}", e)))?;

    if !output.status.success() {
        let _ = fs::remove_file(&tmp_path);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ImportrrError::FFmpeg(format!(
            "exit code {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    fs::rename(&tmp_path, output_file)?;

    if fs::metadata(output_file)?.len() == 0 {
        let _ = fs::remove_file(output_file);
        return Err(ImportrrError::FFmpeg("output file is empty".to_string()));
    }

    // Keep the capture-era mtime on the converted file
    if let Ok(modified) = fs::metadata(input_file).and_then(|m| m.modified()) {
        let _ = filetime::set_file_mtime(output_file, filetime::FileTime::from_system_time(modified));
    }

    log::debug!("FFmpeg transcoding completed successfully");
    Ok(())
}
