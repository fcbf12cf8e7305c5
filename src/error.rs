// Importrr Error Types

use std::path::PathBuf;
use thiserror::Error;

use crate::adapter::report::ReportError;

#[derive(Error, Debug)]
pub enum ImportrrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Directory doesn't exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Path exists but is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("ExifTool error: {0}")]
    ExifTool(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("Organizer report error: {0}")]
    Report(#[from] ReportError),

    #[error("Archive error at {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<figment::Error> for ImportrrError {
    fn from(err: figment::Error) -> Self {
        ImportrrError::Figment(Box::new(err))
    }
}

impl ImportrrError {
    /// Configuration errors end the whole run (and the `schedule` loop);
    /// everything else stays inside its section or cycle.
    pub fn is_config(&self) -> bool {
        matches!(self, ImportrrError::Config(_) | ImportrrError::Figment(_))
    }
}

pub type Result<T> = std::result::Result<T, ImportrrError>;
