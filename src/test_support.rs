// Test support utilities shared by the module tests

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use crate::adapter::{free_normalized_name, MediaTools};
use crate::error::{ImportrrError, Result};

/// In-memory stand-in for exiftool/ffmpeg.
///
/// `organize` moves every staged file into `<base>/<date_folder>/` and reports
/// it; names listed in `unorganizable` are left in the work directory, the way
/// exiftool leaves files without a capture date. `transcode` copies the source
/// to a free normalized name unless the source is listed in `failing_transcodes`.
pub struct FakeTools {
    pub date_folder: String,
    pub unorganizable: Vec<String>,
    pub failing_transcodes: Vec<String>,
    pub fail_organize: bool,
    pub transcoded: RefCell<Vec<String>>,
}

impl Default for FakeTools {
    fn default() -> Self {
        FakeTools {
            date_folder: "2024/03".to_string(),
            unorganizable: Vec::new(),
            failing_transcodes: Vec::new(),
            fail_organize: false,
            transcoded: RefCell::new(Vec::new()),
        }
    }
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaTools for FakeTools {
    fn organize(&self, work_dir: &Path, base_dir: &Path) -> Result<Vec<String>> {
        if self.fail_organize {
            return Err(ImportrrError::ExifTool("simulated organizer crash".to_string()));
        }

        let mut names: Vec<String> = fs::read_dir(work_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();

        let dest_dir = base_dir.join(&self.date_folder);
        fs::create_dir_all(&dest_dir)?;

        let mut produced = Vec::new();
        for name in names {
            if self.unorganizable.contains(&name) {
                continue;
            }
            fs::rename(work_dir.join(&name), dest_dir.join(&name))?;
            produced.push(format!("{}/{}", self.date_folder, name));
        }
        Ok(produced)
    }

    fn transcode(&self, base_dir: &Path, source: &str) -> Option<String> {
        self.transcoded.borrow_mut().push(source.to_string());
        if self.failing_transcodes.iter().any(|s| s == source) {
            return None;
        }
        let output = free_normalized_name(base_dir, source)?;
        fs::copy(base_dir.join(source), base_dir.join(&output)).ok()?;
        Some(output)
    }
}

/// Write `size` bytes of filler to `path`, creating parent directories.
pub fn write_sized(path: &Path, size: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![0x5Au8; size]).unwrap();
}

/// Member names of a tar container, in stored order.
pub fn tar_members(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(file);
    archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
        .collect()
}
