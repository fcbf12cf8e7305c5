// Quiescence filter: picks import files nobody has touched since the cutoff

use std::fs::{self, Metadata};
use std::path::Path;
use chrono::{DateTime, Local, Utc};

/// Latest of the creation/change, modification and access timestamps.
pub fn staleness(meta: &Metadata) -> Option<DateTime<Utc>> {
    let modified = meta.modified().ok().map(DateTime::<Utc>::from);
    let accessed = meta.accessed().ok().map(DateTime::<Utc>::from);

    [created_or_changed(meta), modified, accessed]
        .into_iter()
        .flatten()
        .max()
}

#[cfg(unix)]
fn created_or_changed(meta: &Metadata) -> Option<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;
    DateTime::<Utc>::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32)
}

#[cfg(not(unix))]
fn created_or_changed(meta: &Metadata) -> Option<DateTime<Utc>> {
    meta.created().ok().map(DateTime::<Utc>::from)
}

/// The cutoff is inclusive: a file last touched exactly at the cutoff is settled.
pub fn is_settled(staleness: DateTime<Utc>, cutoff: DateTime<Local>) -> bool {
    staleness <= cutoff.with_timezone(&Utc)
}

/// Names of the plain files directly inside `import_dir` whose staleness is at or
/// before `cutoff`. Never recurses and never fails: a missing directory or an
/// unreadable entry just means fewer candidates.
pub fn find_settled_files(import_dir: &Path, cutoff: DateTime<Local>) -> Vec<String> {
    if !import_dir.exists() {
        log::warn!("Import directory does not exist: {}", import_dir.display());
        return Vec::new();
    }

    if !import_dir.is_dir() {
        log::error!("Import path is not a directory: {}", import_dir.display());
        return Vec::new();
    }

    let entries = match fs::read_dir(import_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("Error accessing directory {}: {}", import_dir.display(), e);
            return Vec::new();
        }
    };

    let mut result = Vec::new();
    let mut scanned = 0usize;

    for entry in entries {
        scanned += 1;
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Cannot read entry in {}: {}", import_dir.display(), e);
                continue;
            }
        };

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                log::warn!("Skipping entry with non UTF-8 name: {:?}", raw);
                continue;
            }
        };

        // Follows symlinks, so a link to a file counts as a file
        let meta = match fs::metadata(entry.path()) {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!("Cannot access {}: {}", name, e);
                continue;
            }
        };

        if meta.is_dir() {
            log::debug!("Skipping directory: {}", name);
            continue;
        }
        if !meta.is_file() {
            log::warn!("Cannot resolve file type for: {}", name);
            continue;
        }

        match staleness(&meta) {
            Some(last) if is_settled(last, cutoff) => {
                log::debug!("Added file for processing: {}", name);
                result.push(name);
            }
            Some(_) => log::debug!("Skipping recently accessed file: {}", name),
            None => log::warn!("No usable timestamps for {}, skipping", name),
        }
    }

    result.sort();
    log::debug!("Scanned {} entries in {}", scanned, import_dir.display());
    log::info!("Found {} files ready for processing in {}", result.len(), import_dir.display());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use filetime::FileTime;
    use tempfile::TempDir;

    #[test]
    fn test_cutoff_boundary_is_inclusive() {
        let cutoff = Local::now();
        let at = cutoff.with_timezone(&Utc);

        assert!(is_settled(at, cutoff));
        assert!(is_settled(at - Duration::microseconds(1), cutoff));
        assert!(!is_settled(at + Duration::microseconds(1), cutoff));
    }

    #[test]
    fn test_missing_import_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let files = find_settled_files(&tmp.path().join("nope"), Local::now());
        assert!(files.is_empty());
    }

    #[test]
    fn test_import_path_that_is_a_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.jpg");
        fs::write(&file, b"x").unwrap();
        assert!(find_settled_files(&file, Local::now() + Duration::minutes(5)).is_empty());
    }

    #[test]
    fn test_directories_are_never_candidates() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("20240101120000")).unwrap();
        fs::write(tmp.path().join("a.jpg"), b"a").unwrap();

        let files = find_settled_files(tmp.path(), Local::now() + Duration::minutes(5));
        assert_eq!(files, vec!["a.jpg".to_string()]);
    }

    #[test]
    fn test_recently_touched_file_is_held_back() {
        let tmp = TempDir::new().unwrap();
        let stale = tmp.path().join("a.jpg");
        let fresh = tmp.path().join("b.jpg");
        fs::write(&stale, b"old").unwrap();
        fs::write(&fresh, b"new").unwrap();

        let future = FileTime::from_system_time(
            std::time::SystemTime::now() + std::time::Duration::from_secs(600),
        );
        filetime::set_file_times(&fresh, future, future).unwrap();

        let files = find_settled_files(tmp.path(), Local::now() + Duration::minutes(1));
        assert_eq!(files, vec!["a.jpg".to_string()]);
    }

    #[test]
    fn test_staleness_takes_latest_timestamp() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("c.jpg");
        fs::write(&file, b"c").unwrap();

        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(3600);
        filetime::set_file_atime(&file, FileTime::from_system_time(later)).unwrap();

        let meta = fs::metadata(&file).unwrap();
        let last = staleness(&meta).unwrap();
        assert!(last >= DateTime::<Utc>::from(later) - Duration::seconds(1));
    }
}
