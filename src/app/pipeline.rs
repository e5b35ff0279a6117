//! Shared dashboard logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load (through the cache) -> resolve range -> filter -> summarize
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::Path;

use tracing::{info, warn};

use crate::data::bls::{BlsClient, Transport};
use crate::domain::{DashConfig, DateRange, ForecastState, SeriesDataset, Summary};
use crate::error::{AppError, ErrorKind};
use crate::io::DatasetCache;
use crate::io::export::write_historical_csv;
use crate::report::{filter_by_year_range, summarize};

/// Everything a front-end needs to draw one refresh.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub full: SeriesDataset,
    /// Years covered by `full`.
    pub span: DateRange,
    /// Selected years.
    pub range: DateRange,
    pub filtered: SeriesDataset,
    /// `None` when the selected range holds no observations.
    pub summary: Option<Summary>,
    /// A broken forecast file does not take the rest of the dashboard down;
    /// the error is kept for display.
    pub forecast: Result<ForecastState, AppError>,
}

/// Load both tables and compute the view for the configured range.
pub fn refresh(cache: &mut DatasetCache, config: &DashConfig) -> Result<DashboardView, AppError> {
    let full = cache.historical(&config.historical_path)?;
    let span = DateRange::span_of(&full).ok_or_else(|| {
        AppError::new(ErrorKind::DataUnavailable, "Historical dataset is empty.")
    })?;
    let range = resolve_range(span, config.start_year, config.end_year)?;

    let forecast = cache.forecast(&config.forecast_path);
    if let Err(err) = &forecast {
        warn!("forecast unavailable: {err}");
    }

    build_view(full, span, range, forecast)
}

/// Recompute the filtered part of an existing view for a new range.
///
/// Used by the TUI when only the selection changes.
pub fn reselect(view: &DashboardView, range: DateRange) -> Result<DashboardView, AppError> {
    build_view(view.full.clone(), view.span, range, view.forecast.clone())
}

fn build_view(
    full: SeriesDataset,
    span: DateRange,
    range: DateRange,
    forecast: Result<ForecastState, AppError>,
) -> Result<DashboardView, AppError> {
    let filtered = filter_by_year_range(&full, range);
    let summary = match summarize(&full, &filtered) {
        Ok(s) => Some(s),
        Err(err) if err.kind() == ErrorKind::EmptyDataset => None,
        Err(err) => return Err(err),
    };

    Ok(DashboardView {
        full,
        span,
        range,
        filtered,
        summary,
        forecast,
    })
}

/// Fill missing bounds from the dataset span; reject inverted ranges.
///
/// Only bounds the user gave can be inverted: a missing bound never crosses
/// the given one, so a lone bound outside the data selects an empty period.
pub fn resolve_range(span: DateRange, start: Option<i32>, end: Option<i32>) -> Result<DateRange, AppError> {
    match (start, end) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        (Some(start), None) => DateRange::new(start, span.end_year().max(start)),
        (None, Some(end)) => DateRange::new(span.start_year().min(end), end),
        (None, None) => Ok(span),
    }
}

/// Fetch a series and persist it where `load_historical` reads it.
///
/// Returns the normalized (ascending, one-per-month) dataset that was written.
pub fn fetch_and_store<T: Transport>(
    client: &BlsClient<T>,
    series_id: &str,
    range: DateRange,
    out: &Path,
) -> Result<SeriesDataset, AppError> {
    let observations = client.fetch_series(series_id, range.start_year(), range.end_year())?;
    if observations.is_empty() {
        return Err(AppError::new(
            ErrorKind::EmptyDataset,
            format!("No observations returned for series {series_id} in {range}."),
        ));
    }

    let dataset = SeriesDataset::from_observations(observations)
        .map_err(|e| AppError::new(ErrorKind::MalformedResponse, e))?;
    write_historical_csv(out, &dataset)?;

    info!(series_id, n = dataset.len(), out = %out.display(), "stored series");
    Ok(dataset)
}
