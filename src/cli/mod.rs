//! Command-line parsing for the unemployment dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/summary code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{DEFAULT_FORECAST_PATH, DEFAULT_HISTORICAL_PATH, DEFAULT_SERIES_ID};

/// Four-digit calendar years only.
fn year_parser() -> clap::builder::RangedI64ValueParser<i32> {
    clap::value_parser!(i32).range(1..=9999)
}

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "udash", version, about = "U.S. unemployment rate dashboard (BLS data)")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print summary figures, the trend plot, and the forecast.
    Show(ShowArgs),
    /// Launch the interactive TUI dashboard.
    Tui(DataArgs),
    /// Download a series from the BLS API and store it as the historical table.
    Fetch(FetchArgs),
}

/// Where the tables live and which years to show.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Historical series CSV (`date` + rate column).
    #[arg(long, value_name = "CSV", default_value = DEFAULT_HISTORICAL_PATH)]
    pub historical: PathBuf,

    /// Forecast CSV (`months_ahead` + predicted rate). Optional.
    #[arg(long, value_name = "CSV", default_value = DEFAULT_FORECAST_PATH)]
    pub forecast: PathBuf,

    /// First year of the selected period (defaults to the first year in the data).
    #[arg(long, value_parser = year_parser())]
    pub start: Option<i32>,

    /// Last year of the selected period (defaults to the last year in the data).
    #[arg(long, value_parser = year_parser())]
    pub end: Option<i32>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// BLS series id.
    #[arg(long, default_value = DEFAULT_SERIES_ID)]
    pub series: String,

    /// First year to request (defaults to nine years before `--end`).
    #[arg(long, value_parser = year_parser())]
    pub start: Option<i32>,

    /// Last year to request (defaults to the current year).
    #[arg(long, value_parser = year_parser())]
    pub end: Option<i32>,

    /// Output CSV, in the layout `show`/`tui` read.
    #[arg(long, value_name = "CSV", default_value = DEFAULT_HISTORICAL_PATH)]
    pub out: PathBuf,

    /// API endpoint (overrides `BLS_API_URL`).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_defaults() {
        let cli = Cli::parse_from(["udash", "show", "--start", "2020"]);
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.data.historical, PathBuf::from(DEFAULT_HISTORICAL_PATH));
        assert_eq!(args.data.start, Some(2020));
        assert_eq!(args.data.end, None);
        assert!(!args.no_plot);
    }

    #[test]
    fn fetch_defaults_and_global_verbose() {
        let cli = Cli::parse_from(["udash", "fetch", "-vv", "--end", "2024"]);
        assert_eq!(cli.verbose, 2);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.series, DEFAULT_SERIES_ID);
        assert_eq!(args.end, Some(2024));
        assert_eq!(args.timeout_secs, 30);
    }

    #[test]
    fn years_outside_the_calendar_are_rejected() {
        for argv in [
            &["udash", "show", "--start=-2147483648"][..],
            &["udash", "tui", "--end", "2147483647"][..],
            &["udash", "fetch", "--end", "0"][..],
            &["udash", "fetch", "--start", "10000"][..],
        ] {
            assert!(Cli::try_parse_from(argv).is_err(), "{argv:?}");
        }
        assert!(Cli::try_parse_from(["udash", "fetch", "--start", "1948", "--end", "9999"]).is_ok());
    }
}
