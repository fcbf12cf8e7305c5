// Ingest side of the pipeline: pick settled files and stage them

pub mod quiescence;
pub mod stage;

use chrono::{DateTime, Duration, Local};
use serde::Serialize;

use crate::constants::RUN_PREFIX_FORMAT;
use crate::error::{ImportrrError, Result};

/// Instants fixed once per run and threaded through every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunClock {
    pub started: DateTime<Local>,
    pub cutoff: DateTime<Local>,
}

impl RunClock {
    /// `cutoff_minutes` before `now` is the newest a file may be touched and still be staged.
    pub fn new(now: DateTime<Local>, cutoff_minutes: i64) -> Result<Self> {
        let cutoff = cutoff_before(now, cutoff_minutes).ok_or_else(|| {
            ImportrrError::Config(format!("time_cutoff_minutes {} is out of range", cutoff_minutes))
        })?;
        Ok(Self { started: now, cutoff })
    }

    /// Sortable prefix naming the work directory and the archive containers of this run.
    pub fn prefix(&self) -> String {
        self.cutoff.format(RUN_PREFIX_FORMAT).to_string()
    }
}

/// `now` minus `cutoff_minutes`, or `None` when that falls off the calendar.
pub fn cutoff_before(now: DateTime<Local>, cutoff_minutes: i64) -> Option<DateTime<Local>> {
    Duration::try_minutes(cutoff_minutes).and_then(|d| now.checked_sub_signed(d))
}
