//! Drop Scan CLI Application
//!
//! Scans the `.se` / `.nu` drop lists for a release date, checks every
//! domain's DNS availability and index presence, and writes dated reports.
//! This CLI application is a thin layer over the drop-scan-lib library.

mod ui;

use chrono::{NaiveDate, Utc};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use drop_scan_lib::{load_env_config, ConfigManager, EnvConfig, FileConfig};
use drop_scan_lib::{
    parse_duration_string, IisDropList, Pipeline, PipelineOptions, ReportWriter, ScanConfig,
};
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for drop-scan
#[derive(Parser, Debug)]
#[command(name = "drop-scan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find expiring .se/.nu domains that are still indexed")]
#[command(
    long_about = "Fetch the IIS drop list for a release date, check each domain's DNS availability and index presence, and write CSV/JSON reports.\n\nRun it once a day (e.g. from cron) to build a dated report archive."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Release date to scan (YYYY-MM-DD, default: today UTC)
    #[arg(long = "date", value_name = "DATE", help_heading = "Scan Selection")]
    pub date: Option<String>,

    /// Also include domains releasing in the next N days
    #[arg(long = "lookahead", value_name = "DAYS", help_heading = "Scan Selection")]
    pub lookahead: Option<u32>,

    /// TLDs to scan (comma-separated or multiple -t flags)
    #[arg(short = 't', long = "tld", value_name = "TLD", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Scan Selection")]
    pub tlds: Option<Vec<String>>,

    /// Skip the DNS availability check
    #[arg(long = "no-availability-check", help_heading = "Checks")]
    pub no_availability_check: bool,

    /// Skip the index presence check
    #[arg(long = "no-index-check", help_heading = "Checks")]
    pub no_index_check: bool,

    /// Index engines to query (comma-separated: wayback, commoncrawl)
    #[arg(
        long = "engines",
        value_name = "ENGINES",
        value_delimiter = ',',
        help_heading = "Checks"
    )]
    pub engines: Option<Vec<String>>,

    /// Pause between calls to the same index engine (e.g. 2.5s, 500ms)
    #[arg(long = "delay", value_name = "DURATION", help_heading = "Checks")]
    pub delay: Option<String>,

    /// Keep every domain, not only indexed ones
    #[arg(long = "all-domains", help_heading = "Filtering")]
    pub all_domains: bool,

    /// Keep only domains DNS reports as available
    #[arg(long = "only-available", help_heading = "Filtering")]
    pub only_available: bool,

    /// Minimum indexed pages for a domain to be reported
    #[arg(long = "min-pages", value_name = "N", help_heading = "Filtering")]
    pub min_pages: Option<u64>,

    /// Directory for report files (default: reports)
    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "DIR",
        help_heading = "Output"
    )]
    pub output_dir: Option<PathBuf>,

    /// Print the final records as JSON on stdout
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// Run fetch and checks without writing reports
    #[arg(long = "dry-run", help_heading = "Modes")]
    pub dry_run: bool,

    /// Only fetch and print the drop list
    #[arg(long = "test-fetch", help_heading = "Modes")]
    pub test_fetch: bool,

    /// List existing report dates and exit
    #[arg(long = "list-reports", help_heading = "Modes")]
    pub list_reports: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Effective settings after layering defaults, files, environment and flags.
#[derive(Debug)]
struct Settings {
    config: ScanConfig,
    lookahead_days: u32,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_tracing(&args);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(date) = &args.date {
        parse_date(date)?;
    }

    let modes = [args.test_fetch, args.list_reports]
        .iter()
        .filter(|&&x| x)
        .count();
    if modes > 1 {
        return Err("Cannot combine --test-fetch and --list-reports".to_string());
    }

    if args.only_available && args.no_availability_check {
        return Err(
            "--only-available needs availability checks, drop --no-availability-check".to_string(),
        );
    }

    if args.min_pages == Some(0) {
        return Err("--min-pages must be at least 1".to_string());
    }

    if let Some(delay) = &args.delay {
        if parse_duration_string(delay).is_none() {
            return Err(format!(
                "Invalid delay '{}'. Use a format like '2.5s', '500ms', '1m'",
                delay
            ));
        }
    }

    if let Some(tlds) = &args.tlds {
        if tlds.iter().all(|t| t.trim().is_empty()) {
            return Err("--tld needs at least one TLD".to_string());
        }
    }

    Ok(())
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD", input))
}

/// Install the tracing subscriber on stderr.
///
/// `-d` / `-v` pick the level for this crate and the library; otherwise
/// `RUST_LOG` applies, defaulting to warnings only.
fn init_tracing(args: &Args) {
    let filter = match log_level(args) {
        Some(level) => EnvFilter::new(format!(
            "warn,drop_scan={level},drop_scan_lib={level}",
            level = level
        )),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn log_level(args: &Args) -> Option<&'static str> {
    if args.debug {
        Some("debug")
    } else if args.verbose {
        Some("info")
    } else {
        None
    }
}

/// Main scan logic
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_config(&args)?;
    let config = &settings.config;

    if args.list_reports {
        return list_reports(config, args.json);
    }

    let today = Utc::now().date_naive();
    let target_date = match &args.date {
        Some(date) => parse_date(date)?,
        None => today,
    };

    if args.test_fetch {
        return test_fetch(config, target_date, settings.lookahead_days, args.json).await;
    }

    let options = pipeline_options(&args, &settings, target_date, today);
    if !args.json {
        for notice in run_notices(&args, &options, target_date) {
            ui::print_notice(&notice);
        }
    }

    let mut pipeline = Pipeline::from_config(config, options)?;

    if !args.json {
        ui::print_header(target_date, config, pipeline.options());
    }

    let show_progress = !args.json;
    let start = Instant::now();
    let outcome = pipeline
        .run_with_progress(target_date, |position, total, record| {
            if show_progress {
                ui::print_record(record, Some((position, total)));
            }
        })
        .await?;
    let elapsed = start.elapsed();

    info!(
        fetched = outcome.fetched,
        kept = outcome.records.len(),
        ?elapsed,
        "scan finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.records)?);
    } else {
        ui::print_summary(&outcome, elapsed);
        match &outcome.report {
            Some(paths) => ui::print_report_paths(paths),
            None => ui::print_notice("Dry run, no reports written"),
        }
    }

    Ok(())
}

fn pipeline_options(
    args: &Args,
    settings: &Settings,
    target_date: NaiveDate,
    today: NaiveDate,
) -> PipelineOptions {
    PipelineOptions {
        // nothing can be available before its release date
        check_availability: !args.no_availability_check && target_date <= today,
        check_index: !args.no_index_check,
        only_indexed: !args.all_domains && !args.no_index_check,
        only_available: args.only_available,
        dry_run: args.dry_run,
        min_indexed_pages: settings.config.min_indexed_pages,
        lookahead_days: settings.lookahead_days,
    }
}

/// Notices about checks the run will skip.
fn run_notices(args: &Args, options: &PipelineOptions, target_date: NaiveDate) -> Vec<String> {
    let mut notices = Vec::new();

    if args.no_index_check && !args.all_domains {
        notices.push("Index check skipped, reporting all domains".to_string());
    }
    if !args.no_availability_check && !options.check_availability {
        notices.push(format!(
            "{} is in the future, skipping availability checks",
            target_date
        ));
        if options.only_available {
            notices.push(
                "--only-available keeps nothing while availability is unchecked, the report will be empty"
                    .to_string(),
            );
        }
    }

    notices
}

fn list_reports(config: &ScanConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let writer = ReportWriter::new(config.report_dir.clone());
    let dates = writer.list_reports()?;

    if json {
        let dates: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
        println!("{}", serde_json::to_string_pretty(&dates)?);
    } else {
        ui::print_report_list(writer.directory(), &dates);
    }
    Ok(())
}

async fn test_fetch(
    config: &ScanConfig,
    target_date: NaiveDate,
    lookahead_days: u32,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = IisDropList::new(config)?;
    let window = source.fetch_window(target_date, lookahead_days).await?;
    let entries = window.entries;
    debug!(count = entries.len(), "test fetch finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        ui::print_feed_sizes(&window.feed_sizes);
        ui::print_drop_list(target_date, &entries);
    }
    Ok(())
}

/// Build the effective configuration.
///
/// Precedence, lowest first: defaults, config files (or an explicit
/// `--config` / `DS_CONFIG` file), `DS_*` environment variables, CLI flags.
fn build_config(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let config_manager = ConfigManager::new();

    let file_config = match (&args.config, &env_config.config) {
        (Some(path), _) => {
            debug!(path = path.as_str(), "using config file from --config");
            config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        (None, Some(path)) => {
            debug!(path = %path.display(), "using config file from DS_CONFIG");
            config_manager.load_file(path).map_err(|e| {
                format!("Failed to load config file '{}': {}", path.display(), e)
            })?
        }
        (None, None) => config_manager.discover_and_load()?,
    };

    layer_config(args, &file_config, &env_config)
}

fn layer_config(
    args: &Args,
    file_config: &FileConfig,
    env_config: &EnvConfig,
) -> Result<Settings, Box<dyn std::error::Error>> {
    let config = file_config.apply_to(ScanConfig::default())?;
    let config = env_config.apply_to(config);
    let config = apply_cli_args_to_config(config, args)?;
    config.validate()?;

    Ok(Settings {
        config,
        lookahead_days: args
            .lookahead
            .or_else(|| file_config.lookahead_days())
            .unwrap_or(0),
    })
}

/// Apply CLI flags, the highest-precedence layer.
fn apply_cli_args_to_config(mut config: ScanConfig, args: &Args) -> Result<ScanConfig, String> {
    if let Some(tlds) = &args.tlds {
        config.tlds = tlds
            .iter()
            .map(|t| t.trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
    }

    if let Some(engines) = &args.engines {
        config.engines = engines
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
    }

    if let Some(delay) = &args.delay {
        config.index_delay = parse_duration_string(delay)
            .ok_or_else(|| format!("Invalid delay '{}'", delay))?;
    }

    if let Some(min) = args.min_pages {
        config.min_indexed_pages = min;
    }

    if let Some(dir) = &args.output_dir {
        config.report_dir = dir.clone();
    }

    Ok(config)
}
