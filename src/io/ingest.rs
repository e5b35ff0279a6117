//! CSV ingest and normalization.
//!
//! Two tables feed the dashboard:
//!
//! - the historical series (`date`, rate): required, a missing or empty file is
//!   `DataUnavailable`
//! - the forecast (`months_ahead`, predicted rate): optional, a missing file is
//!   [`ForecastState::Absent`]
//!
//! Header names are matched case-insensitively and a few aliases are accepted
//! for the value columns, since the files are produced by separate tooling.

use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::{ForecastDataset, ForecastPoint, ForecastState, Observation, SeriesDataset, month_start};
use crate::error::{AppError, ErrorKind};

const DATE_COLUMN: &str = "date";
const VALUE_COLUMNS: [&str; 3] = ["value", "unemployment_rate", "rate"];
const HORIZON_COLUMNS: [&str; 2] = ["months_ahead", "month_ahead"];
const PREDICTION_COLUMNS: [&str; 3] = ["predicted_value", "predicted_unemployment_rate", "predicted_rate"];

/// Load the historical series, sorted ascending by month.
pub fn load_historical(path: &Path) -> Result<SeriesDataset, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            ErrorKind::DataUnavailable,
            format!("Failed to open historical data '{}': {e}", path.display()),
        )
    })?;

    let mut reader = csv_reader(file);
    let header_map = read_header_map(&mut reader).map_err(|e| {
        AppError::new(
            ErrorKind::DataUnavailable,
            format!("Failed to read headers of '{}': {e}", path.display()),
        )
    })?;

    let unavailable = |msg: String| {
        AppError::new(ErrorKind::DataUnavailable, format!("{}: {msg}", path.display()))
    };
    let malformed =
        |msg: String| AppError::new(ErrorKind::MalformedData, format!("{}: {msg}", path.display()));

    let date_idx = *header_map
        .get(DATE_COLUMN)
        .ok_or_else(|| unavailable(format!("Missing required column: `{DATE_COLUMN}`")))?;
    let value_idx = resolve_column(&header_map, &VALUE_COLUMNS).ok_or_else(|| {
        unavailable(format!("Missing required value column (one of: {}).", VALUE_COLUMNS.join(", ")))
    })?;

    let mut observations = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| malformed(format!("line {line}: CSV parse error: {e}")))?;

        let date = get_required(&record, date_idx, DATE_COLUMN)
            .and_then(parse_month)
            .map_err(|e| malformed(format!("line {line}: {e}")))?;
        let value = get_required(&record, value_idx, "value")
            .and_then(parse_rate)
            .map_err(|e| malformed(format!("line {line}: {e}")))?;

        observations.push(Observation { date, value });
    }

    if observations.is_empty() {
        return Err(unavailable("No data rows.".to_string()));
    }

    let dataset = SeriesDataset::from_observations(observations).map_err(malformed)?;
    info!(path = %path.display(), n = dataset.len(), "loaded historical series");
    Ok(dataset)
}

/// Load the optional forecast table.
///
/// A missing file is the expected first-run state and yields `Absent`.
pub fn load_forecast(path: &Path) -> Result<ForecastState, AppError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            debug!(path = %path.display(), "no forecast file");
            return Ok(ForecastState::Absent);
        }
        Err(e) => {
            return Err(AppError::new(
                ErrorKind::DataUnavailable,
                format!("Failed to open forecast '{}': {e}", path.display()),
            ));
        }
    };

    let malformed =
        |msg: String| AppError::new(ErrorKind::MalformedData, format!("{}: {msg}", path.display()));

    let mut reader = csv_reader(file);
    let header_map =
        read_header_map(&mut reader).map_err(|e| malformed(format!("Failed to read headers: {e}")))?;

    let horizon_idx = resolve_column(&header_map, &HORIZON_COLUMNS).ok_or_else(|| {
        malformed(format!("Missing horizon column (one of: {}).", HORIZON_COLUMNS.join(", ")))
    })?;
    let value_idx = resolve_column(&header_map, &PREDICTION_COLUMNS).ok_or_else(|| {
        malformed(format!(
            "Missing prediction column (one of: {}).",
            PREDICTION_COLUMNS.join(", ")
        ))
    })?;

    let mut points = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| malformed(format!("line {line}: CSV parse error: {e}")))?;

        let months_ahead = get_required(&record, horizon_idx, "months_ahead")
            .and_then(parse_horizon)
            .map_err(|e| malformed(format!("line {line}: {e}")))?;
        let predicted_value = get_required(&record, value_idx, "predicted value")
            .and_then(parse_rate)
            .map_err(|e| malformed(format!("line {line}: {e}")))?;

        points.push(ForecastPoint {
            months_ahead,
            predicted_value,
        });
    }

    let dataset = ForecastDataset::from_points(points).map_err(malformed)?;
    info!(path = %path.display(), horizon = dataset.horizon(), "loaded forecast");
    Ok(ForecastState::Loaded(dataset))
}

fn csv_reader(file: File) -> csv::Reader<File> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file)
}

fn read_header_map(reader: &mut csv::Reader<File>) -> Result<HashMap<String, usize>, csv::Error> {
    let headers = reader.headers()?.clone();
    Ok(build_header_map(&headers))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|name| header_map.get(*name).copied())
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

/// Parse a calendar month, resolved to its first day.
fn parse_month(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    let parsed = FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        // `YYYY-MM` has no day, which chrono will not parse on its own.
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok());

    parsed
        .and_then(|d| month_start(d.year(), d.month()))
        .ok_or_else(|| format!("Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY-MM, MM/DD/YYYY."))
}

fn parse_rate(s: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid numeric value '{s}'."))?;
    if !v.is_finite() || v < 0.0 {
        return Err(format!("Rate must be finite and non-negative, got '{s}'."));
    }
    Ok(v)
}

/// Horizons may be written as integers or integral floats (`3.0`).
fn parse_horizon(s: &str) -> Result<u32, String> {
    if let Ok(v) = s.parse::<u32>() {
        if v == 0 {
            return Err("Horizon must be at least 1 month.".to_string());
        }
        return Ok(v);
    }

    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Horizon '{s}' is not an integer."))?;
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(format!("Horizon '{s}' is not an integer."));
    }
    if v < 1.0 || v > u32::MAX as f64 {
        return Err(format!("Horizon '{s}' is out of range."));
    }
    Ok(v as u32)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn historical_is_sorted_and_month_resolved() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "hist.csv",
            "date,unemployment_rate\n2021-01-01,6.0\n2020-01-01,3.5\n2020-02,4.4\n",
        );

        let ds = load_historical(&path).unwrap();
        let rows: Vec<_> = ds.iter().map(|o| (o.date, o.value)).collect();
        assert_eq!(
            rows,
            [
                (ymd(2020, 1, 1), 3.5),
                (ymd(2020, 2, 1), 4.4),
                (ymd(2021, 1, 1), 6.0),
            ]
        );
    }

    #[test]
    fn historical_load_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "hist.csv", "\u{feff}Date,Value\n2020-01-01,3.5\n2020-02-01,4.4\n");
        assert_eq!(load_historical(&path).unwrap(), load_historical(&path).unwrap());
    }

    #[test]
    fn historical_unavailable_cases() {
        let dir = TempDir::new().unwrap();
        let cases = [
            dir.path().join("missing.csv"),
            write_file(&dir, "zero.csv", ""),
            write_file(&dir, "header_only.csv", "date,value\n"),
            write_file(&dir, "no_value.csv", "date,other\n2020-01-01,1\n"),
            write_file(&dir, "no_date.csv", "month,value\n2020-01-01,1\n"),
        ];
        for path in cases {
            let err = load_historical(&path).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DataUnavailable, "{}: {err}", path.display());
        }
    }

    #[test]
    fn historical_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let cases = [
            ("bad_date.csv", "date,value\nyesterday,3.5\n"),
            ("bad_value.csv", "date,value\n2020-01-01,n/a\n"),
            ("negative.csv", "date,value\n2020-01-01,-1.0\n"),
            ("dup.csv", "date,value\n2020-01-01,3.5\n2020-01-15,3.6\n"),
        ];
        for (name, body) in cases {
            let path = write_file(&dir, name, body);
            let err = load_historical(&path).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedData, "{name}: {err}");
        }

        let path = write_file(&dir, "line.csv", "date,value\n2020-01-01,3.5\n2020-02-01,oops\n");
        assert!(load_historical(&path).unwrap_err().to_string().contains("line 3"));
    }

    #[test]
    fn missing_forecast_is_absent() {
        let dir = TempDir::new().unwrap();
        let state = load_forecast(&dir.path().join("12_month_forecast.csv")).unwrap();
        assert_eq!(state, ForecastState::Absent);
        assert!(state.dataset().is_none());
    }

    #[test]
    fn forecast_preserves_values_in_horizon_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "fc.csv",
            "month_ahead,predicted_unemployment_rate\n2.0,4.1\n1.0,4.0\n3.0,4.3\n",
        );

        let state = load_forecast(&path).unwrap();
        let ds = state.dataset().unwrap();
        let rows: Vec<_> = ds.points().iter().map(|p| (p.months_ahead, p.predicted_value)).collect();
        assert_eq!(rows, [(1, 4.0), (2, 4.1), (3, 4.3)]);
    }

    #[test]
    fn forecast_present_but_malformed() {
        let dir = TempDir::new().unwrap();
        let cases = [
            ("zero.csv", ""),
            ("no_horizon.csv", "step,predicted_value\n1,4.0\n"),
            ("no_value.csv", "months_ahead,other\n1,4.0\n"),
            ("fraction.csv", "months_ahead,predicted_value\n1.5,4.0\n"),
            ("word.csv", "months_ahead,predicted_value\none,4.0\n"),
            ("zero_h.csv", "months_ahead,predicted_value\n0,4.0\n"),
            ("gap.csv", "months_ahead,predicted_value\n1,4.0\n3,4.1\n"),
            ("dup.csv", "months_ahead,predicted_value\n1,4.0\n1,4.1\n"),
            ("empty.csv", "months_ahead,predicted_value\n"),
        ];
        for (name, body) in cases {
            let path = write_file(&dir, name, body);
            let err = load_forecast(&path).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedData, "{name}: {err}");
        }
    }

    #[test]
    fn horizon_parsing() {
        assert_eq!(parse_horizon("12").unwrap(), 12);
        assert_eq!(parse_horizon("12.0").unwrap(), 12);
        assert!(parse_horizon("-1").is_err());
        assert!(parse_horizon("2.5").is_err());
        assert!(parse_horizon("NaN").is_err());
    }

    #[test]
    fn month_parsing_formats() {
        assert_eq!(parse_month("2020-03-17").unwrap(), ymd(2020, 3, 1));
        assert_eq!(parse_month("2020-03").unwrap(), ymd(2020, 3, 1));
        assert_eq!(parse_month("03/17/2020").unwrap(), ymd(2020, 3, 1));
        assert!(parse_month("2020-13").is_err());
    }
}
