//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - loads, filters and summarizes the tables
//! - prints reports/plots or hands over to the TUI
//! - runs the explicit fetch-and-store step

use std::time::Duration;

use chrono::Datelike;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DataArgs, FetchArgs, ShowArgs};
use crate::data::bls::{BlsClient, BlsConfig};
use crate::domain::{DashConfig, DateRange, ForecastState};
use crate::error::AppError;
use crate::io::DatasetCache;

pub mod pipeline;

/// Entry point for the `udash` binary.
pub fn run() -> Result<(), AppError> {
    // `udash` and `udash --start 2010` behave like `udash tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let interactive = matches!(cli.command, Command::Tui(_));
    init_logging(cli.verbose, interactive);

    match cli.command {
        Command::Show(args) => handle_show(args),
        Command::Tui(args) => handle_tui(args),
        Command::Fetch(args) => handle_fetch(args),
    }
}

/// Log to stderr. The TUI owns the terminal, so it only logs errors unless
/// `RUST_LOG` asks for more.
fn init_logging(verbose: u8, interactive: bool) {
    let default = match (interactive, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Ignore the error if a subscriber is already installed (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let config = DashConfig {
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        ..dash_config_from_args(&args.data)
    };

    let mut cache = DatasetCache::new();
    let view = pipeline::refresh(&mut cache, &config)?;

    println!("{}", crate::report::format_dashboard(&view));

    if config.plot {
        println!("Unemployment Rate Over Time");
        println!(
            "{}",
            crate::plot::render_history_plot(&view.filtered, config.plot_width, config.plot_height)
        );
        if let Ok(ForecastState::Loaded(forecast)) = &view.forecast {
            println!("{}", crate::report::forecast_title(&view.forecast));
            println!(
                "{}",
                crate::plot::render_forecast_plot(forecast, config.plot_width, config.plot_height)
            );
        }
    }

    Ok(())
}

fn handle_tui(args: DataArgs) -> Result<(), AppError> {
    crate::tui::run(dash_config_from_args(&args))
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let end = args.end.unwrap_or_else(|| chrono::Local::now().year());
    let start = args.start.unwrap_or(end.saturating_sub(9));
    let range = DateRange::new(start, end)?;

    let mut bls = BlsConfig::from_env();
    if let Some(url) = args.api_url {
        bls.api_url = url;
    }
    bls.timeout = Duration::from_secs(args.timeout_secs);
    debug!(url = %bls.api_url, keyed = bls.api_key.is_some(), "bls config");

    let client = BlsClient::new(bls)?;
    let dataset = pipeline::fetch_and_store(&client, &args.series, range, &args.out)?;

    if let (Some(first), Some(last)) = (dataset.first(), dataset.last()) {
        println!(
            "Stored {} observations of {} ({}..{}) in {}",
            dataset.len(),
            args.series,
            first.date.format("%Y-%m"),
            last.date.format("%Y-%m"),
            args.out.display()
        );
    }
    Ok(())
}

pub fn dash_config_from_args(args: &DataArgs) -> DashConfig {
    DashConfig {
        historical_path: args.historical.clone(),
        forecast_path: args.forecast.clone(),
        start_year: args.start,
        end_year: args.end,
        ..DashConfig::default()
    }
}

/// Rewrite argv so `udash` defaults to `udash tui`.
///
/// Rules:
/// - `udash`                      -> `udash tui`
/// - `udash --start 2010 ...`     -> `udash tui --start 2010 ...`
/// - `udash --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "show" | "tui" | "fetch");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
