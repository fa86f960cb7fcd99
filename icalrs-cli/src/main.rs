use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use icalrs_core::calendar::Calendar;
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "icalrs")]
#[command(about = "Load, validate and enumerate RFC 5545 iCalendar streams")]
struct Cli {
    /// Path to the .ics file to operate on.
    #[arg(long)]
    ical: PathBuf,

    /// Path to an icalrs.toml config file, overriding the default search order.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand recurrence rules and list occurrences in a window.
    Enumerate {
        /// Window start, YYYYMMDD.
        #[arg(long)]
        dtstart: String,
        /// Window end, YYYYMMDD.
        #[arg(long)]
        dtend: String,
        /// Treat any non-conformance as fatal.
        #[arg(long)]
        conformance: bool,
    },
    /// Load the calendar and report whether it is strictly conformant.
    Validate {
        #[arg(long)]
        conformance: bool,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
struct Settings {
    #[serde(default)]
    conformance: bool,
    #[serde(default)]
    slot_duration_minutes: Option<i64>,
}

fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let mut builder = Config::builder().set_default("conformance", false)?;

    if let Some(path) = explicit {
        builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
    } else {
        builder = builder.add_source(config::File::with_name("icalrs").required(false));
    }

    builder = builder.add_source(config::Environment::with_prefix("ICALRS").try_parsing(true));

    Ok(builder.build()?.try_deserialize()?)
}

fn locate_ical(path: &Path) -> Result<PathBuf> {
    for candidate in [Path::new("ics").join(path), path.to_path_buf()] {
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    if path.is_absolute() && path.exists() {
        return Ok(path.to_path_buf());
    }
    anyhow::bail!("could not find {} under ./ics, ./ or as an absolute path", path.display())
}

fn parse_window_date(raw: &str) -> Result<chrono::NaiveDateTime> {
    let date = chrono::NaiveDate::parse_from_str(raw, "%Y%m%d").with_context(|| format!("invalid date '{raw}', expected YYYYMMDD"))?;
    Ok(date.and_time(chrono::NaiveTime::MIN))
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    let resolved_path = locate_ical(&cli.ical)?;
    let input = fs::read_to_string(&resolved_path).with_context(|| format!("reading {}", resolved_path.display()))?;

    match cli.command {
        Commands::Validate { conformance } => {
            let conformance = conformance || settings.conformance;
            let calendar = Calendar::load(&input, conformance)?;
            let compliant = calendar.validate_strict();

            if compliant {
                println!("OK: {} is strictly conformant", resolved_path.display());
            } else {
                println!("NON-CONFORMANT: {} diagnostic(s) recorded", calendar.diagnostics().log().len());
                for diagnostic in calendar.diagnostics().log() {
                    println!("  [{}] line {}: {}", diagnostic.rfc_tag, diagnostic.line_number, diagnostic.annotation.as_deref().unwrap_or(""));
                }
            }

            Ok(compliant || !conformance)
        }
        Commands::Enumerate { dtstart, dtend, conformance } => {
            let conformance = conformance || settings.conformance;
            let calendar = Calendar::load(&input, conformance)?;

            if conformance && calendar.diagnostics().has_fatal() {
                eprintln!("fatal non-conformance under --conformance");
                return Ok(false);
            }

            let window_start = parse_window_date(&dtstart)?;
            let window_end = parse_window_date(&dtend)?;

            for entry in calendar.enumerate(window_start, window_end) {
                let Some(naive) = entry.occurrence.start.to_naive() else { continue };
                println!("{}  {}  {}", naive.format("%Y-%m-%d %H:%M:%S"), entry.uid, entry.summary.as_deref().unwrap_or(""));
            }

            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
