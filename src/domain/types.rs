//! Shared domain types.
//!
//! Datasets are immutable once built: every refresh re-creates them from the
//! persisted tables, so the ordering invariants are checked exactly once at
//! construction.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

/// BLS series id for the seasonally adjusted U.S. unemployment rate.
pub const DEFAULT_SERIES_ID: &str = "LNS14000000";

pub const DEFAULT_HISTORICAL_PATH: &str = "data/processed/unemployment_rate.csv";
pub const DEFAULT_FORECAST_PATH: &str = "data/processed/12_month_forecast.csv";

/// Resolve a calendar month to the date used for ordering (the first day).
pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// One monthly reading of the indicator, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Observations ordered by date, strictly increasing, one per month.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesDataset {
    observations: Vec<Observation>,
}

impl SeriesDataset {
    /// Sort ascending and normalize every date to its month start.
    ///
    /// Two observations falling in the same month are rejected; the error
    /// names the offending month.
    pub fn from_observations(mut observations: Vec<Observation>) -> Result<Self, String> {
        for obs in observations.iter_mut() {
            obs.date = month_start(obs.date.year(), obs.date.month())
                .ok_or_else(|| format!("Invalid month for {}.", obs.date))?;
        }
        observations.sort_by_key(|o| o.date);

        if let Some(pair) = observations.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(format!(
                "Duplicate observation for {}.",
                pair[1].date.format("%Y-%m")
            ));
        }

        Ok(Self { observations })
    }

    /// Build from a subsequence that is already known to be ordered.
    pub(crate) fn from_ordered(observations: Vec<Observation>) -> Self {
        debug_assert!(observations.windows(2).all(|w| w[0].date < w[1].date));
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    /// Chronologically last observation.
    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }
}

/// One forecast horizon: value predicted `months_ahead` months after the
/// last historical observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub months_ahead: u32,
    pub predicted_value: f64,
}

/// Forecast points ordered by horizon; horizons are exactly `1..=n`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDataset {
    points: Vec<ForecastPoint>,
}

impl ForecastDataset {
    pub fn from_points(mut points: Vec<ForecastPoint>) -> Result<Self, String> {
        if points.is_empty() {
            return Err("Forecast has no points.".to_string());
        }
        points.sort_by_key(|p| p.months_ahead);

        for (idx, p) in points.iter().enumerate() {
            let expected = idx as u32 + 1;
            if p.months_ahead == expected {
                continue;
            }
            if idx > 0 && points[idx - 1].months_ahead == p.months_ahead {
                return Err(format!("Duplicate horizon: {} months ahead.", p.months_ahead));
            }
            return Err(format!(
                "Horizons must be contiguous from 1; expected {expected}, found {}.",
                p.months_ahead
            ));
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Furthest horizon (the forecast length in months).
    pub fn horizon(&self) -> u32 {
        self.points.last().map(|p| p.months_ahead).unwrap_or(0)
    }
}

/// Result of looking for the optional forecast table.
///
/// `Absent` is the normal first-run state (no forecast produced yet), not a
/// failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastState {
    Loaded(ForecastDataset),
    Absent,
}

impl ForecastState {
    pub fn dataset(&self) -> Option<&ForecastDataset> {
        match self {
            ForecastState::Loaded(ds) => Some(ds),
            ForecastState::Absent => None,
        }
    }
}

/// Inclusive year interval; construction enforces `start_year <= end_year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start_year: i32,
    end_year: i32,
}

impl DateRange {
    pub fn new(start_year: i32, end_year: i32) -> Result<Self, AppError> {
        if start_year > end_year {
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                format!("Invalid year range: start {start_year} is after end {end_year}."),
            ));
        }
        Ok(Self {
            start_year,
            end_year,
        })
    }

    /// Years covered by the dataset, or `None` when it is empty.
    pub fn span_of(dataset: &SeriesDataset) -> Option<Self> {
        let first = dataset.first()?.year();
        let last = dataset.last()?.year();
        Some(Self {
            start_year: first,
            end_year: last,
        })
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.start_year && year <= self.end_year
    }

    /// Replace either bound, keeping `start <= end` by dragging the other bound along.
    pub fn with_start(self, start_year: i32) -> Self {
        Self {
            start_year,
            end_year: self.end_year.max(start_year),
        }
    }

    pub fn with_end(self, end_year: i32) -> Self {
        Self {
            start_year: self.start_year.min(end_year),
            end_year,
        }
    }

    /// Intersect with `bounds`; `None` when they do not overlap.
    pub fn clamp_to(self, bounds: DateRange) -> Option<Self> {
        let start_year = self.start_year.max(bounds.start_year);
        let end_year = self.end_year.min(bounds.end_year);
        (start_year <= end_year).then_some(Self {
            start_year,
            end_year,
        })
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_year, self.end_year)
    }
}

/// Headline numbers shown above the trend chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Last value of the full (unfiltered) dataset.
    pub latest: f64,
    pub latest_date: NaiveDate,
    /// Mean over the selected range.
    pub average: f64,
    /// Maximum over the selected range.
    pub peak: f64,
    pub peak_date: NaiveDate,
    /// Observations in the selected range.
    pub count: usize,
}

/// Resolved settings for a dashboard refresh.
#[derive(Debug, Clone)]
pub struct DashConfig {
    pub historical_path: PathBuf,
    pub forecast_path: PathBuf,
    /// Requested bounds; a missing bound defaults to the dataset's span.
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            historical_path: PathBuf::from(DEFAULT_HISTORICAL_PATH),
            forecast_path: PathBuf::from(DEFAULT_FORECAST_PATH),
            start_year: None,
            end_year: None,
            plot: true,
            plot_width: 100,
            plot_height: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(y: i32, m: u32, d: u32, value: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            value,
        }
    }

    #[test]
    fn dataset_sorts_and_normalizes_to_month_start() {
        let ds = SeriesDataset::from_observations(vec![
            obs(2021, 1, 15, 6.0),
            obs(2020, 2, 1, 4.4),
            obs(2020, 1, 31, 3.5),
        ])
        .unwrap();

        let dates: Vec<_> = ds.iter().map(|o| o.date.to_string()).collect();
        assert_eq!(dates, ["2020-01-01", "2020-02-01", "2021-01-01"]);
        assert_eq!(ds.last().unwrap().value, 6.0);
    }

    #[test]
    fn dataset_rejects_two_readings_in_one_month() {
        let err = SeriesDataset::from_observations(vec![obs(2020, 3, 1, 4.4), obs(2020, 3, 20, 4.5)])
            .unwrap_err();
        assert!(err.contains("2020-03"), "{err}");
    }

    #[test]
    fn forecast_requires_contiguous_unique_horizons() {
        let p = |m, v| ForecastPoint {
            months_ahead: m,
            predicted_value: v,
        };

        let ds = ForecastDataset::from_points(vec![p(3, 4.3), p(1, 4.0), p(2, 4.1)]).unwrap();
        let horizons: Vec<_> = ds.points().iter().map(|p| p.months_ahead).collect();
        assert_eq!(horizons, [1, 2, 3]);
        assert_eq!(ds.horizon(), 3);

        assert!(ForecastDataset::from_points(vec![p(1, 4.0), p(1, 4.1)])
            .unwrap_err()
            .contains("Duplicate"));
        assert!(ForecastDataset::from_points(vec![p(1, 4.0), p(3, 4.1)])
            .unwrap_err()
            .contains("contiguous"));
        assert!(ForecastDataset::from_points(vec![p(2, 4.0)]).is_err());
        assert!(ForecastDataset::from_points(Vec::new()).is_err());
    }

    #[test]
    fn date_range_validation_and_adjustment() {
        assert_eq!(
            DateRange::new(2021, 2020).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        let r = DateRange::new(2000, 2010).unwrap();
        assert!(r.contains(2000) && r.contains(2010) && !r.contains(2011));

        let moved = r.with_start(2015);
        assert_eq!((moved.start_year(), moved.end_year()), (2015, 2015));
        let moved = r.with_end(1990);
        assert_eq!((moved.start_year(), moved.end_year()), (1990, 1990));

        let bounds = DateRange::new(2005, 2030).unwrap();
        let clamped = r.clamp_to(bounds).unwrap();
        assert_eq!((clamped.start_year(), clamped.end_year()), (2005, 2010));
        assert!(DateRange::new(1950, 1960).unwrap().clamp_to(bounds).is_none());
    }

    #[test]
    fn span_of_empty_dataset_is_none() {
        assert!(DateRange::span_of(&SeriesDataset::default()).is_none());
    }
}
