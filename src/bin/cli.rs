//! run-congestion CLI - Driver for overlap and density analysis
//!
//! Usage:
//!   run-congestion-cli overlaps <pace.csv> <overlaps.csv> --start-times Full=420 10K=440 Half=460
//!   run-congestion-cli density <pace.csv> --start-times ... --segment "10K,Half,0.00,2.74,3.0,uni"
//!   run-congestion-cli validate <overlaps.csv> --start-times ...
//!
//! Loads the CSV tables, runs the analysis and prints the report text.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use run_congestion::{
    AnalysisConfig, DensityConfig, DensitySegment, ExecutionMode, RankBy, SegmentSelection,
    analyze_density, analyze_overlaps, filter_overlap_segments, io, parse_start_times,
    validate_overlap_segments,
};

#[derive(Parser)]
#[command(name = "run-congestion-cli")]
#[command(about = "Runner interference and course density analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print per-segment narration before the ranked summary
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect overlaps on every declared shared segment and rank them
    Overlaps {
        /// Pace table (event, runner_id, pace, distance)
        pace_csv: PathBuf,

        /// Overlap table (event, start, end, overlapswith[, description])
        overlaps_csv: PathBuf,

        /// Event start times as Event=minutes_since_midnight
        #[arg(long, num_args = 1.., required = true)]
        start_times: Vec<String>,

        /// Overlap tolerance in seconds
        #[arg(long, default_value = "60")]
        time_window: f64,

        /// Fine sampling step in km
        #[arg(long, default_value = "0.03")]
        step: f64,

        /// Ranking metric: peak_ratio or intensity
        #[arg(long, default_value = "peak_ratio")]
        rank_by: RankBy,

        /// Only analyze these ranges, e.g. 10K:5.81-8.10
        #[arg(long, num_args = 1..)]
        segments: Vec<String>,

        /// Write the ranked summary as CSV (prefixed with a UTC timestamp)
        #[arg(long)]
        export_summary: Option<PathBuf>,

        /// Run segments one after another instead of on the worker pool
        #[arg(long)]
        sequential: bool,

        /// Fail on rows whose events have no start time
        #[arg(long)]
        strict: bool,
    },

    /// Sample per-step density and roll it up per segment
    Density {
        /// Pace table (event, runner_id, pace, distance)
        pace_csv: PathBuf,

        /// Event start times as Event=minutes_since_midnight
        #[arg(long, num_args = 1.., required = true)]
        start_times: Vec<String>,

        /// Segments as EventA,EventB,from,to,width,direction (EventB may be empty)
        #[arg(long = "segment", num_args = 1.., required = true)]
        segments: Vec<String>,

        /// Sampling step in km
        #[arg(long, default_value = "0.03")]
        step: f64,

        /// Presence window in seconds
        #[arg(long, default_value = "60")]
        time_window: f64,

        /// Print the structured blocks as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check an overlap table for direction errors and duplicate rows
    Validate {
        overlaps_csv: PathBuf,

        /// Event start times as Event=minutes_since_midnight
        #[arg(long, num_args = 1.., required = true)]
        start_times: Vec<String>,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Overlaps {
            pace_csv,
            overlaps_csv,
            start_times,
            time_window,
            step,
            rank_by,
            segments,
            export_summary,
            sequential,
            strict,
        } => {
            let mut config = AnalysisConfig::default();
            config.detection.time_window_secs = time_window;
            config.detection.step_km = step;
            config.rank_by = rank_by;
            config.verbose = cli.verbose;
            config.strict_events = strict;
            if sequential {
                config.execution_mode = ExecutionMode::Sequential;
            }
            run_overlaps(
                &pace_csv,
                &overlaps_csv,
                &start_times,
                &segments,
                &config,
                export_summary.as_deref(),
            )
        }
        Commands::Density {
            pace_csv,
            start_times,
            segments,
            step,
            time_window,
            json,
        } => {
            let config = DensityConfig {
                step_km: step,
                window_secs: time_window,
            };
            run_density(&pace_csv, &start_times, &segments, &config, json)
        }
        Commands::Validate {
            overlaps_csv,
            start_times,
        } => run_validate(&overlaps_csv, &start_times),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

type CliResult = Result<ExitCode, Box<dyn std::error::Error>>;

fn run_overlaps(
    pace_csv: &Path,
    overlaps_csv: &Path,
    start_times: &[String],
    selections: &[String],
    config: &AnalysisConfig,
    export_summary: Option<&Path>,
) -> CliResult {
    let start_times = parse_start_times(start_times)?;
    let pace = io::read_pace_csv(pace_csv)?;
    let declared = io::read_overlaps_csv(overlaps_csv)?;
    println!(
        "Loaded {} runners across {} events, {} overlap rows",
        pace.len(),
        pace.events().len(),
        declared.len()
    );

    let selections = selections
        .iter()
        .map(|s| s.parse::<SegmentSelection>())
        .collect::<Result<Vec<_>, _>>()?;
    let segments = filter_overlap_segments(&declared, &selections)?;

    let report = analyze_overlaps(&pace, &segments, &start_times, config)?;
    println!();
    print!("{}", report.report_text);

    for skipped in &report.skipped {
        println!(
            "[SKIP] {} vs {} {:.2}-{:.2}km: no start time for {}",
            skipped.event,
            skipped.overlaps_with,
            skipped.start_km,
            skipped.end_km,
            skipped.missing_events.join(", ")
        );
    }

    if let Some(requested) = export_summary {
        let path = timestamped_path(requested);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        io::write_summary_csv_path(&path, &report.records)?;
        println!("Wrote summary CSV to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

/// `out/summary.csv` -> `out/2025-08-06T133027_summary.csv`
fn timestamped_path(requested: &Path) -> PathBuf {
    let stem = requested
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("summary");
    let ext = requested
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("csv");
    let name = format!("{}_{stem}.{ext}", Utc::now().format("%Y-%m-%dT%H%M%S"));
    requested.with_file_name(name)
}

fn run_density(
    pace_csv: &Path,
    start_times: &[String],
    segments: &[String],
    config: &DensityConfig,
    json: bool,
) -> CliResult {
    let start_times = parse_start_times(start_times)?;
    let pace = io::read_pace_csv(pace_csv)?;
    let segments = segments
        .iter()
        .map(|s| s.parse::<DensitySegment>())
        .collect::<Result<Vec<_>, _>>()?;

    let report = analyze_density(&pace, &segments, &start_times, config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report.blocks)?);
    } else {
        println!("{}", report.text);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_validate(overlaps_csv: &Path, start_times: &[String]) -> CliResult {
    let start_times = parse_start_times(start_times)?;
    let declared = io::read_overlaps_csv(overlaps_csv)?;
    let issues = validate_overlap_segments(&declared, &start_times);

    if issues.is_empty() {
        println!("[OK] {} overlap rows, all correctly directed, no duplicates", declared.len());
        return Ok(ExitCode::SUCCESS);
    }
    for issue in &issues {
        println!("[ERR] {issue}");
    }
    println!("\n{} issue(s) in {} rows", issues.len(), declared.len());
    Ok(ExitCode::FAILURE)
}
