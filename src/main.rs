mod config;
mod duration;
mod extract;
mod folder;
mod scan;
mod table;
mod tree;

use clap::{Parser, Subcommand};
use config::ExtractConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Summarize automated build/agent run logs: start and end times, build
/// outcome, and per-provider token usage, as CSV tables.
#[derive(Parser, Debug)]
#[command(name = "buildlog-summary", version, about)]
pub struct Cli {
    /// Config file path (TOML); built-in markers are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Extra logging (per-file progress, skipped lines)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract one log file and print the result as JSON
    File {
        /// Log file to extract
        log: PathBuf,
    },
    /// Summarize every log file in a folder into <folder>_summary.csv
    Folder {
        /// Folder containing log files
        source: PathBuf,

        /// Directory for the summary CSV (default: the source folder)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },
    /// Summarize each config subfolder of a root folder
    Tree {
        /// Root folder whose subfolders hold log files
        root: PathBuf,

        /// Directory for the per-folder summary CSVs (default: each subfolder)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Also write the combined table, with its config column, to this file
        #[arg(long)]
        combined: Option<PathBuf>,
    },
    /// Export every timestamped line of a log file as CSV
    Timestamps {
        /// Log file to scan
        log: PathBuf,

        /// Output CSV path (default: ./<log-stem>_extracted.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    tracing::debug!(?cli, "parsed CLI arguments");

    let config = match ExtractConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match &cli.command {
        Command::File { log } => {
            let result = extract::extract_single_file(log, &config);
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize result");
                    return ExitCode::FAILURE;
                }
            }
        }
        Command::Folder { source, dest } => {
            let table = folder::aggregate_folder(source, dest.as_deref(), &config);
            println!("Processed {} log files", table.len());
        }
        Command::Tree {
            root,
            dest,
            combined,
        } => {
            let table = tree::aggregate_tree(root, dest.as_deref(), &config);
            println!("Processed {} log files", table.len());
            if let Some(path) = combined {
                if table.is_empty() {
                    tracing::info!("no rows, combined summary not written");
                } else if let Err(e) = table.write_csv(path) {
                    tracing::error!(error = %e, "failed to write combined summary");
                    return ExitCode::FAILURE;
                } else {
                    tracing::info!(path = %path.display(), "combined summary saved");
                }
            }
        }
        Command::Timestamps { log, output } => {
            let cwd = PathBuf::from(".");
            match extract::export_timestamps(log, output.as_deref(), &cwd, &config) {
                Ok(Some(path)) => println!("Data saved to {}", path.display()),
                Ok(None) => println!("No data to save."),
                Err(e) => {
                    tracing::error!(error = %e, "failed to export timestamps");
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
