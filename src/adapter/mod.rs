// External media tools behind a narrow interface
//
// The pipeline only needs two capabilities: organize a staged batch and
// normalize a raw video. `ExternalTools` backs them with exiftool and ffmpeg;
// tests substitute an in-memory fake.

pub mod exiftool;
pub mod ffmpeg;
pub mod report;

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{MAX_NAME_SUFFIX, NORMALIZED_VIDEO_EXTENSION, RAW_VIDEO_EXTENSIONS};
use crate::error::Result;
use crate::tools;

pub trait MediaTools {
    /// Rename/date-bucket every file in `work_dir` into `base_dir` and return the
    /// produced paths relative to `base_dir`, in the order the tool reported them.
    fn organize(&self, work_dir: &Path, base_dir: &Path) -> Result<Vec<String>>;

    /// Normalize the raw video at `source` (relative to `base_dir`). `None` means
    /// no output was produced.
    fn transcode(&self, base_dir: &Path, source: &str) -> Option<String>;
}

/// exiftool + ffmpeg child processes, one at a time.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    pub exiftool: PathBuf,
    pub ffmpeg: PathBuf,
}

impl ExternalTools {
    pub fn new(exiftool: PathBuf, ffmpeg: PathBuf) -> Self {
        Self { exiftool, ffmpeg }
    }

    /// Locate both binaries with the usual override/sidecar/PATH lookup.
    pub fn resolve() -> Self {
        Self::new(tools::exiftool_path(), tools::ffmpeg_path())
    }
}

impl MediaTools for ExternalTools {
    fn organize(&self, work_dir: &Path, base_dir: &Path) -> Result<Vec<String>> {
        exiftool::backfill_videos(&self.exiftool, work_dir, base_dir)?;
        let output = exiftool::organize(&self.exiftool, work_dir, base_dir)?;
        let paths = report::parse_organize_report(&output)?;
        log::info!("Organized {} files to {}", paths.len(), base_dir.display());
        Ok(paths)
    }

    fn transcode(&self, base_dir: &Path, source: &str) -> Option<String> {
        ffmpeg::convert(&self.ffmpeg, &self.exiftool, base_dir, source)
    }
}

/// Whether the extension marks a camera container that gets normalized before archival.
pub fn is_raw_video(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| RAW_VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Same stem, normalized extension. `None` for anything that is not a raw video.
pub fn normalized_name(source: &str) -> Option<String> {
    if !is_raw_video(source) {
        return None;
    }
    let normalized = Path::new(source).with_extension(NORMALIZED_VIDEO_EXTENSION);
    Some(normalized.to_string_lossy().to_string())
}

/// Normalized name for `source` that does not exist yet under `base_dir`.
/// Falls back to `<stem>-1.mp4`, `<stem>-2.mp4`, ... the way the organizer
/// numbers its own collisions.
pub fn free_normalized_name(base_dir: &Path, source: &str) -> Option<String> {
    let plain = normalized_name(source)?;
    if !occupied(&base_dir.join(&plain)) {
        return Some(plain);
    }

    let path = Path::new(source);
    let stem = path.file_stem()?.to_string_lossy().to_string();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    (1..=MAX_NAME_SUFFIX)
        .map(|n| {
            parent
                .join(format!("{}-{}.{}", stem, n, NORMALIZED_VIDEO_EXTENSION))
                .to_string_lossy()
                .to_string()
        })
        .find(|candidate| !occupied(&base_dir.join(candidate)))
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_raw_video() {
        assert!(is_raw_video("2024/01/clip.mov"));
        assert!(is_raw_video("2024/01/CLIP.MOV"));
        assert!(!is_raw_video("2024/01/clip.mp4"));
        assert!(!is_raw_video("2024/01/photo.jpg"));
        assert!(!is_raw_video("2024/01/mov"));
    }

    #[test]
    fn test_normalized_name_keeps_stem_and_folder() {
        assert_eq!(
            normalized_name("2024/01/20240101-120000.MOV").as_deref(),
            Some("2024/01/20240101-120000.mp4")
        );
        assert_eq!(normalized_name("2024/01/a.jpg"), None);
    }

    #[test]
    fn test_free_normalized_name_steps_past_existing_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("2024/03");
        fs::create_dir_all(&dir).unwrap();

        assert_eq!(
            free_normalized_name(tmp.path(), "2024/03/x.mov").as_deref(),
            Some("2024/03/x.mp4")
        );

        fs::write(dir.join("x.mp4"), "other capture").unwrap();
        fs::write(dir.join("x-1.mp4"), "another one").unwrap();
        assert_eq!(
            free_normalized_name(tmp.path(), "2024/03/x.mov").as_deref(),
            Some("2024/03/x-2.mp4")
        );
    }
}
