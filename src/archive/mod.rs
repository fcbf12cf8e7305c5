// Archiver: packs organized files into size-capped tar containers for cold storage

pub mod pack;

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use serde::Serialize;

use crate::adapter::{is_raw_video, MediaTools};
use crate::constants::{ARCHIVE_EXTENSION, ARCHIVE_LOCK_FILENAME, DEFAULT_ARCHIVE_SIZE_CAP};
use crate::error::{ImportrrError, Result};
use pack::Member;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArchiveOptions {
    /// Advisory cap on the summed member size of one container.
    pub size_cap: u64,
    /// Normalize raw videos before archiving them.
    pub transcode: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            size_cap: DEFAULT_ARCHIVE_SIZE_CAP,
            transcode: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Container {
    pub path: PathBuf,
    pub members: Vec<String>,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveReport {
    pub containers: Vec<Container>,
    /// Inputs left out: vanished, not a regular file, failed to transcode, or
    /// already queued under the same member name.
    pub skipped: Vec<String>,
    /// Set when a container write failed. Writing stops there; the containers
    /// listed above are closed and stay on disk.
    pub error: Option<String>,
}

/// Pack `files` (relative to `base_dir`) into containers under `archive_dir`.
///
/// Containers are written one after another. A failed write ends archival with
/// `ArchiveReport::error` set; the containers already closed, and the partial
/// one, stay on disk. `Err` is only returned when nothing could be started.
pub fn archive_files(
    base_dir: &Path,
    files: &[String],
    archive_dir: &Path,
    prefix: &str,
    options: &ArchiveOptions,
    tools: &dyn MediaTools,
) -> Result<ArchiveReport> {
    let mut report = ArchiveReport::default();
    if files.is_empty() {
        return Ok(report);
    }

    log::info!("Creating archive with {} files in {}", files.len(), archive_dir.display());
    let _lock = WriteLock::acquire(archive_dir)?;

    let members = prepare_members(base_dir, files, options, tools, &mut report.skipped);
    let bins = pack::pack(members, options.size_cap);
    let names = pack::container_names(prefix, bins.len());

    for (name, bin) in names.into_iter().zip(bins) {
        let path = archive_dir.join(format!("{}.{}", name, ARCHIVE_EXTENSION));
        if let Err(source) = write_container(base_dir, &path, &bin) {
            let err = ImportrrError::Archive { path, source };
            log::error!("{}; {} container(s) already closed", err, report.containers.len());
            report.error = Some(err.to_string());
            break;
        }

        let bytes = bin.iter().map(|m| m.size).sum();
        log::info!("Wrote {} ({} files, {} bytes)", path.display(), bin.len(), bytes);
        report.containers.push(Container {
            path,
            members: bin.into_iter().map(|m| m.path).collect(),
            bytes,
        });
    }

    Ok(report)
}

/// Resolve each input to the file that actually gets archived, with its size.
fn prepare_members(
    base_dir: &Path,
    files: &[String],
    options: &ArchiveOptions,
    tools: &dyn MediaTools,
    skipped: &mut Vec<String>,
) -> Vec<Member> {
    let mut members = Vec::with_capacity(files.len());
    let mut queued: HashSet<String> = HashSet::new();

    for file in files {
        let path = if options.transcode && is_raw_video(file) {
            match tools.transcode(base_dir, file) {
                Some(converted) => converted,
                None => {
                    log::warn!("Conversion failed, leaving {} out of the archive", file);
                    skipped.push(file.clone());
                    continue;
                }
            }
        } else {
            file.clone()
        };

        if queued.contains(&path) {
            log::warn!("Already queued for this archive, skipping duplicate: {}", path);
            skipped.push(path);
            continue;
        }

        match fs::metadata(base_dir.join(&path)) {
            Ok(meta) if meta.is_file() => {
                queued.insert(path.clone());
                members.push(Member { path, size: meta.len() });
            }
            Ok(_) => {
                log::warn!("Not a regular file, skipping: {}", path);
                skipped.push(path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("File no longer exists, skipping: {}", path);
                skipped.push(path);
            }
            Err(e) => {
                log::warn!("Cannot stat {}, skipping: {}", path, e);
                skipped.push(path);
            }
        }
    }

    members
}

/// Containers are write-once: an existing file at `path` is an error.
fn write_container(base_dir: &Path, path: &Path, members: &[Member]) -> io::Result<()> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut builder = tar::Builder::new(BufWriter::new(file));

    for member in members {
        builder.append_path_with_name(base_dir.join(&member.path), &member.path)?;
    }

    let mut writer = builder.into_inner()?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// `write.lock` marker held in the archive directory while containers are written.
struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    fn acquire(archive_dir: &Path) -> Result<Self> {
        let path = archive_dir.join(ARCHIVE_LOCK_FILENAME);
        if path.is_file() {
            log::warn!("Lock file already exists: {}", path.display());
        } else {
            File::create(&path)?;
        }
        Ok(Self { path })
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}
