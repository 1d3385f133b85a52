//! `icalfmt` CLI: run formatter profiles over iCalendar files.
//!
//! ## Usage
//!
//! ```sh
//! # Collapse, clean up and re-key a timetable export (stdin → stdout)
//! curl -s https://timetable.example.edu/feed.ics | icalfmt format --profile timetable
//!
//! # File to file, with profiles loaded from a registry file
//! icalfmt format --profile uni --profiles profiles.json -i feed.ics -o clean.ics
//!
//! # List the available profiles
//! icalfmt profiles --profiles profiles.json
//!
//! # Show what the pipeline would extract from a calendar
//! icalfmt details -i feed.ics
//! ```

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ical_formatter::{codec, extract_details, Formatter, ProfileRegistry};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "icalfmt",
    version,
    about = "Deterministic iCalendar transformation pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a calendar with a named profile
    Format {
        /// Profile to run
        #[arg(short, long)]
        profile: String,
        /// JSON profile registry merged over the built-in profiles
        #[arg(long)]
        profiles: Option<PathBuf>,
        /// Extension bundle overriding the profile's own
        #[arg(long)]
        extension: Option<PathBuf>,
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List profile names, one per line
    Profiles {
        /// JSON profile registry merged over the built-in profiles
        #[arg(long)]
        profiles: Option<PathBuf>,
    },
    /// Print the details extracted from a calendar as JSON
    Details {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct DetailsReport {
    subject: String,
    events: usize,
    series: usize,
    components: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Format {
            profile,
            profiles,
            extension,
            input,
            output,
        } => {
            let registry = load_registry(profiles.as_deref())?;
            let config = registry
                .resolve_with_extension(&profile, extension.as_deref())
                .with_context(|| format!("Failed to resolve profile '{profile}'"))?;

            let text = read_input(input.as_deref())?;
            let document = codec::parse(&text).context("Failed to parse iCalendar input")?;
            let document = Formatter::new(config)
                .transform(document)
                .with_context(|| format!("Profile '{profile}' failed"))?;

            write_output(output.as_deref(), &codec::serialize(&document))?;
        }
        Commands::Profiles { profiles } => {
            let registry = load_registry(profiles.as_deref())?;
            for name in registry.names() {
                println!("{name}");
            }
        }
        Commands::Details { input } => {
            let text = read_input(input.as_deref())?;
            let document = codec::parse(&text).context("Failed to parse iCalendar input")?;
            let details = extract_details(&document);
            let report = DetailsReport {
                subject: details.subject,
                events: document.events.len(),
                series: document.events.iter().filter(|e| e.has_recurrence()).count(),
                components: document.components.len(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Install a stderr subscriber. `RUST_LOG` wins over `-v` when set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_registry(path: Option<&Path>) -> Result<ProfileRegistry> {
    match path {
        Some(path) => ProfileRegistry::from_json_file(path)
            .with_context(|| format!("Failed to load profiles from {}", path.display())),
        None => Ok(ProfileRegistry::builtin()),
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
