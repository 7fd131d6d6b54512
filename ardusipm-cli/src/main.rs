//! ArduSiPM Log Reader CLI Application
//!
//! This is the command-line interface for the ArduSiPM frame decoder.
//! It uses the ardusipm-decoder library and adds:
//! - TOML configuration with command-line overrides
//! - Single-file, directory and threshold-scan commands
//! - Text/JSON summaries and CSV table export

use anyhow::{Context, Result};
use ardusipm_decoder::{export, Decoder, ParseMode, QualityReport};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use report::RunSummary;

/// ArduSiPM Log Reader - Decode and merge ArduSiPM frame files
#[derive(Parser, Debug)]
#[command(name = "ardusipm-cli")]
#[command(about = "Decode and merge ArduSiPM frame files", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Write the decoded table to a CSV file
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,

    /// Print the corruption summary per declared count
    #[arg(long, global = true)]
    quality: bool,

    /// Frames come from firmware older than 2.6
    #[arg(long, global = true)]
    legacy: bool,

    /// Print summaries as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one frame file
    Decode {
        /// Frame file to decode
        file: PathBuf,

        /// Read only the timestamp and count of each frame
        #[arg(long)]
        counts_only: bool,
    },

    /// Merge every matching frame file of a directory
    Merge {
        /// Directory holding the runs
        dir: PathBuf,

        /// Only merge files whose name contains this text
        #[arg(long, value_name = "TEXT")]
        include: Option<String>,

        /// Skip files whose name contains this text
        #[arg(long, value_name = "TEXT")]
        exclude: Option<String>,

        /// Read only the timestamp and count of each frame
        #[arg(long)]
        counts_only: bool,

        /// Parse files in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Summarize a threshold-scan directory
    Thresholds {
        /// Directory holding the `...Scan_<threshold>.csv` runs
        dir: PathBuf,

        /// Count rows with ADC above this value
        #[arg(long, value_name = "ADC")]
        adc_cut: Option<i64>,

        /// Skip files whose name contains this text
        #[arg(long, value_name = "TEXT")]
        exclude: Option<String>,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("ArduSiPM Log Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", ardusipm_decoder::VERSION);

    let mut app = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    apply_global_flags(&mut app, &args);

    match &args.command {
        Command::Decode { file, counts_only } => decode_mode(&app, file, *counts_only),
        Command::Merge {
            dir,
            include,
            exclude,
            counts_only,
            parallel,
        } => {
            if include.is_some() {
                app.merge.include = include.clone();
            }
            if exclude.is_some() {
                app.merge.exclude = exclude.clone();
            }
            if *counts_only {
                app.merge.mode = ParseMode::Counts;
            }
            app.merge.parallel |= *parallel;
            merge_mode(&app, dir)
        }
        Command::Thresholds { dir, adc_cut, exclude } => {
            if let Some(cut) = adc_cut {
                app.thresholds.adc_cut = *cut;
            }
            if exclude.is_some() {
                app.merge.exclude = exclude.clone();
            }
            thresholds_mode(&app, dir)
        }
    }
}

/// Command-line flags shared by every command override the configuration file
fn apply_global_flags(app: &mut AppConfig, args: &Args) {
    if args.legacy {
        app.decoder.legacy_payload = true;
    }
    if args.verbose > 1 {
        app.decoder.trace_frames = true;
    }
    if args.output.is_some() {
        app.output.csv = args.output.clone();
    }
    if args.quality {
        app.output.quality = true;
    }
    if args.json {
        app.output.format = OutputFormat::Json;
    }
}

/// Decode mode - parse one file and print its summary
fn decode_mode(app: &AppConfig, file: &Path, counts_only: bool) -> Result<()> {
    let mode = if counts_only { ParseMode::Counts } else { app.merge.mode };
    let decoder = Decoder::with_config(app.decoder.clone());

    let table = decoder
        .parse_file(file, mode)
        .with_context(|| format!("Failed to decode frame file: {:?}", file))?;

    let mut summary = RunSummary::from_table(&table);
    if app.output.quality {
        summary = summary.with_quality(QualityReport::from_records(&table.records));
    }
    report::write_summary(&mut io::stdout().lock(), &summary, app.output.format)?;

    if let Some(csv) = &app.output.csv {
        export::write_table_file(csv, &table.records)
            .with_context(|| format!("Failed to write table: {:?}", csv))?;
    }
    Ok(())
}

/// Merge mode - merge a directory and print the corpus summary
fn merge_mode(app: &AppConfig, dir: &Path) -> Result<()> {
    let decoder = Decoder::with_config(app.decoder.clone());

    let corpus = decoder
        .merge_directory(dir, &app.merge)
        .with_context(|| format!("Failed to merge directory: {:?}", dir))?;

    if let Some(weight) = corpus.rate_weight() {
        log::debug!("Rate weight: {:.6e} per row", weight);
    }

    let mut summary = RunSummary::from_corpus(&corpus);
    if app.output.quality {
        summary = summary.with_quality(QualityReport::from_records(&corpus.records));
    }
    report::write_summary(&mut io::stdout().lock(), &summary, app.output.format)?;

    if let Some(csv) = &app.output.csv {
        export::write_table_file(csv, &corpus.records)
            .with_context(|| format!("Failed to write table: {:?}", csv))?;
    }
    Ok(())
}

/// Thresholds mode - one summary line per scan point
fn thresholds_mode(app: &AppConfig, dir: &Path) -> Result<()> {
    let decoder = Decoder::with_config(app.decoder.clone());

    let points = decoder
        .scan_thresholds(dir, &app.merge, app.thresholds.adc_cut)
        .with_context(|| format!("Failed to scan thresholds in: {:?}", dir))?;

    report::write_thresholds(&mut io::stdout().lock(), &points, app.output.format)?;
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
