// Run controller: drives scan -> stage -> organize -> archive -> cleanup per section
//
// Sections run one after another. Whatever goes wrong inside a section is
// logged, recorded in its outcome and does not stop the next section.

use std::path::PathBuf;
use std::time::Instant;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::adapter::MediaTools;
use crate::archive::{self, ArchiveOptions, ArchiveReport};
use crate::config::Section;
use crate::error::Result;
use crate::ingest::quiescence::find_settled_files;
use crate::ingest::stage::{finish_work_dir, stage_files, StageReport, WorkDirOutcome};
use crate::ingest::RunClock;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Scanning,
    Staging,
    Organizing,
    Archiving,
    Cleanup,
    Done,
    Failed,
}

/// Result of one import folder cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub import_dir: PathBuf,
    pub candidates: Vec<String>,
    pub stage: StageReport,
    pub organized: Vec<String>,
    pub work_dir: Option<WorkDirOutcome>,
    pub archive: Option<ArchiveReport>,
    pub archive_error: Option<String>,
}

impl ImportReport {
    fn new(import_dir: PathBuf) -> Self {
        Self {
            import_dir,
            candidates: Vec::new(),
            stage: StageReport::default(),
            organized: Vec::new(),
            work_dir: None,
            archive: None,
            archive_error: None,
        }
    }
}

/// Runs the pipeline for the import folders of one section.
pub struct SectionRunner<'a> {
    section: &'a Section,
    options: ArchiveOptions,
    tools: &'a dyn MediaTools,
    state: RunState,
}

impl<'a> SectionRunner<'a> {
    pub fn new(section: &'a Section, options: ArchiveOptions, tools: &'a dyn MediaTools) -> Self {
        Self {
            section,
            options,
            tools,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("[{}] {:?} -> {:?}", self.section.name, self.state, next);
        self.state = next;
    }

    /// One cycle for `import_dir` (relative to the album directory). An `Err`
    /// leaves the runner in `Failed`.
    pub fn launch(&mut self, import_dir: &str, clock: &RunClock) -> Result<ImportReport> {
        self.state = RunState::Idle;
        let result = self.launch_inner(import_dir, clock);
        if result.is_err() {
            self.transition(RunState::Failed);
        }
        result
    }

    fn launch_inner(&mut self, import_dir: &str, clock: &RunClock) -> Result<ImportReport> {
        let section = self.section;
        let timer = Instant::now();
        let import_path = section.album_dir.join(import_dir);
        log::info!("Starting processing for import directory: {}", import_path.display());

        self.transition(RunState::Scanning);
        section.check_dirs()?;

        let mut report = ImportReport::new(import_path.clone());
        report.candidates = find_settled_files(&import_path, clock.cutoff);

        if report.candidates.is_empty() {
            log::info!("No files found for processing");
            self.transition(RunState::Done);
            return Ok(report);
        }

        self.transition(RunState::Staging);
        let work_dir = import_path.join(clock.prefix());
        report.stage = stage_files(&import_path, &work_dir, &report.candidates)?;

        self.transition(RunState::Organizing);
        report.organized = self.tools.organize(&work_dir, &section.album_dir)?;

        match section.archive_dir {
            Some(ref archive_dir) => {
                self.transition(RunState::Archiving);
                let prefix = section.archive_prefix(&clock.prefix(), import_dir);
                match archive::archive_files(
                    &section.album_dir,
                    &report.organized,
                    archive_dir,
                    &prefix,
                    &self.options,
                    self.tools,
                ) {
                    Ok(archived) => {
                        report.archive_error = archived.error.clone();
                        report.archive = Some(archived);
                    }
                    Err(e) => {
                        log::error!("[{}] Archival failed: {}", section.name, e);
                        report.archive_error = Some(e.to_string());
                    }
                }
            }
            None => log::info!("No archive configured, organized: {:?}", report.organized),
        }

        self.transition(RunState::Cleanup);
        let outcome = finish_work_dir(&work_dir);
        if outcome == WorkDirOutcome::Removed {
            log::info!("Successfully processed all files");
        }
        report.work_dir = Some(outcome);

        self.transition(RunState::Done);
        log::info!(
            "Completed processing {} files in {:.2}s",
            report.candidates.len(),
            timer.elapsed().as_secs_f64()
        );
        Ok(report)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SectionStatus {
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionOutcome {
    pub name: String,
    pub status: SectionStatus,
    pub imports: Vec<ImportReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub clock: RunClock,
    pub sections: Vec<SectionOutcome>,
}

impl RunSummary {
    pub fn failed_sections(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| matches!(s.status, SectionStatus::Failed(_)))
            .map(|s| s.name.as_str())
            .collect()
    }
}

/// Run every import folder of `section`. The first hard failure ends the section;
/// an archival error marks it failed but later folders still run.
pub fn run_section(
    section: &Section,
    options: ArchiveOptions,
    tools: &dyn MediaTools,
    clock: &RunClock,
) -> SectionOutcome {
    let mut runner = SectionRunner::new(section, options, tools);
    let mut outcome = SectionOutcome {
        name: section.name.clone(),
        status: SectionStatus::Completed,
        imports: Vec::new(),
    };

    for import_dir in &section.import_dirs {
        match runner.launch(import_dir, clock) {
            Ok(report) => {
                if let Some(ref err) = report.archive_error {
                    if outcome.status == SectionStatus::Completed {
                        outcome.status = SectionStatus::Failed(err.clone());
                    }
                }
                outcome.imports.push(report);
            }
            Err(e) => {
                log::error!("Section '{}' failed on import '{}': {}", section.name, import_dir, e);
                outcome.status = SectionStatus::Failed(e.to_string());
                break;
            }
        }
    }

    outcome
}

/// One full cycle over all sections with a cutoff derived from `now`.
///
/// Section failures are reported in the summary; `Err` means the cycle could
/// not start at all (an unusable cutoff), which is a configuration error.
pub fn run_sections(
    sections: &[Section],
    options: ArchiveOptions,
    tools: &dyn MediaTools,
    now: DateTime<Local>,
    cutoff_minutes: i64,
) -> Result<RunSummary> {
    let clock = RunClock::new(now, cutoff_minutes)?;
    log::info!("Run started, cutoff {}", clock.cutoff.format("%Y-%m-%d %H:%M:%S"));

    let sections = sections
        .iter()
        .map(|section| run_section(section, options, tools, &clock))
        .collect();

    let summary = RunSummary { clock, sections };
    let failed = summary.failed_sections();
    if failed.is_empty() {
        log::info!("All {} sections completed", summary.sections.len());
    } else {
        log::warn!("{} of {} sections failed: {:?}", failed.len(), summary.sections.len(), failed);
    }
    Ok(summary)
}
