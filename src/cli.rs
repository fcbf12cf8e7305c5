// importrr CLI binary

use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use chrono::Local;
use clap::{Parser, Subcommand};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

use importrr_lib::adapter::ExternalTools;
use importrr_lib::config::{self, Config};
use importrr_lib::run::{run_sections, RunSummary, SectionStatus};
use importrr_lib::ingest::stage::WorkDirOutcome;
use importrr_lib::tools;

#[derive(Parser)]
#[command(name = "importrr")]
#[command(about = "importrr - moves settled photo uploads into a dated album and archives them", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one import cycle over every section
    Run {
        /// Configuration file (defaults to importrr.toml lookup)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run import cycles on a fixed interval
    Schedule {
        /// Configuration file (defaults to importrr.toml lookup)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Minutes between cycles
        #[arg(long, default_value = "5")]
        every: u64,
        /// Run a cycle immediately instead of waiting one interval
        #[arg(long)]
        run_on_startup: bool,
    },

    /// Show the configured sections
    Sections {
        /// Configuration file (defaults to importrr.toml lookup)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check that exiftool and ffmpeg can be found
    Tools,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Run { config, json } => cmd_run(config, json),
        Commands::Schedule { config, every, run_on_startup } => cmd_schedule(config, every, run_on_startup),
        Commands::Sections { config } => cmd_sections(config),
        Commands::Tools => cmd_tools(),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_run(config: Option<PathBuf>, json: bool) -> Result<()> {
    let config = Config::load(config.as_deref())?;
    let summary = run_once(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    let failed = summary.failed_sections();
    if !failed.is_empty() {
        anyhow::bail!("{} section(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn cmd_schedule(config: Option<PathBuf>, every: u64, run_on_startup: bool) -> Result<()> {
    if every == 0 {
        anyhow::bail!("--every must be at least 1 minute");
    }
    let config = Config::load(config.as_deref())?;
    let interval = Duration::from_secs(every * 60);
    log::info!("Scheduling import cycles every {} minute(s)", every);

    if !run_on_startup {
        thread::sleep(interval);
    }

    loop {
        match run_once(&config) {
            Ok(summary) => {
                let failed = summary.failed_sections();
                if failed.is_empty() {
                    log::info!("Cycle finished, next in {} minute(s)", every);
                } else {
                    log::error!("Cycle finished with failed sections {:?}, next in {} minute(s)", failed, every);
                }
            }
            // Configuration errors end the loop
            Err(e) if e.is_config() => return Err(e.into()),
            Err(e) => log::error!("Cycle could not run: {}, next in {} minute(s)", e, every),
        }
        thread::sleep(interval);
    }
}

fn cmd_sections(config: Option<PathBuf>) -> Result<()> {
    let path = config::locate(config.as_deref())?;
    let config = Config::from_file(&path)?;

    println!("Configuration: {}", path.display());
    println!("Time cutoff:   {} min", config.time_cutoff_minutes);
    println!("Archive cap:   {}", format_size(config.archive.size_cap));
    println!("Transcode:     {}", config.archive.transcode);
    println!();

    println!("{:<16}  {:<8}  {:<40}  {}", "Section", "Serial", "Album", "Imports");
    println!("{}", "-".repeat(80));
    for section in &config.sections {
        println!(
            "{:<16}  {:<8}  {:<40}  {}",
            section.name,
            section.serial.as_deref().unwrap_or("-"),
            section.album_dir.display(),
            section.import_dirs.join(", ")
        );
        match section.archive_dir {
            Some(ref dir) => println!("{:<16}  archive -> {}", "", dir.display()),
            None => println!("{:<16}  archive disabled", ""),
        }
    }

    Ok(())
}

fn cmd_tools() -> Result<()> {
    let checks = [
        ("exiftool", tools::exiftool_path()),
        ("ffmpeg", tools::ffmpeg_path()),
    ];

    let mut missing = Vec::new();
    for (name, path) in &checks {
        let ok = tools::is_tool_available(name);
        println!("{:<10} {:<8} {}", name, if ok { "ok" } else { "MISSING" }, path.display());
        if !ok {
            missing.push(*name);
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("Required tools not available: {}", missing.join(", "));
    }
    Ok(())
}

fn run_once(config: &Config) -> importrr_lib::Result<RunSummary> {
    let tools = ExternalTools::resolve();
    run_sections(
        &config.sections,
        config.archive,
        &tools,
        Local::now(),
        config.time_cutoff_minutes,
    )
}

fn print_summary(summary: &RunSummary) {
    println!("Run cutoff: {}", summary.clock.cutoff.format("%Y-%m-%d %H:%M:%S"));
    println!();

    for section in &summary.sections {
        match section.status {
            SectionStatus::Completed => println!("[ok]     {}", section.name),
            SectionStatus::Failed(ref err) => println!("[failed] {}: {}", section.name, err),
        }

        for import in &section.imports {
            println!("  {}", import.import_dir.display());
            println!("    Settled:    {}", import.candidates.len());
            println!("    Staged:     {}", import.stage.moved.len());
            if !import.stage.skipped.is_empty() || !import.stage.failed.is_empty() {
                println!(
                    "    Not staged: {} skipped, {} failed",
                    import.stage.skipped.len(),
                    import.stage.failed.len()
                );
            }
            println!("    Organized:  {}", import.organized.len());

            if let Some(ref archive) = import.archive {
                for container in &archive.containers {
                    println!(
                        "    Archive:    {} ({} files, {})",
                        container.path.display(),
                        container.members.len(),
                        format_size(container.bytes)
                    );
                }
                if !archive.skipped.is_empty() {
                    println!("    Left out:   {}", archive.skipped.join(", "));
                }
            }
            if let Some(ref err) = import.archive_error {
                println!("    Archive error: {}", err);
            }

            match import.work_dir {
                Some(WorkDirOutcome::Preserved(ref leftovers)) => {
                    println!("    Kept work dir with {} file(s):", leftovers.len());
                    for name in leftovers {
                        println!("      {}", name);
                    }
                }
                Some(WorkDirOutcome::RemoveFailed(ref err)) => {
                    println!("    Work dir not removed: {}", err);
                }
                _ => {}
            }
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
