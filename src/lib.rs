// importrr - Library Entry Point

pub mod constants;
pub mod error;
pub mod tools;
pub mod config;
pub mod ingest;
pub mod adapter;
pub mod archive;
pub mod run;

#[cfg(test)]
mod test_support;

pub use config::{Config, Section};
pub use error::{ImportrrError, Result};
pub use run::{run_sections, RunSummary, SectionStatus};
