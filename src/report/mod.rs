//! Range filtering, summary figures, and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{DateRange, Observation, SeriesDataset, Summary};
use crate::error::{AppError, ErrorKind};

/// Observations whose year lies in `range` (inclusive), in original order.
///
/// Because the dataset is sorted, the result is a contiguous run; an empty
/// result is valid.
pub fn filter_by_year_range(dataset: &SeriesDataset, range: DateRange) -> SeriesDataset {
    let obs = dataset.observations();
    let start = obs.partition_point(|o| o.year() < range.start_year());
    let end = obs.partition_point(|o| o.year() <= range.end_year());
    let kept = if start < end { obs[start..end].to_vec() } else { Vec::new() };
    SeriesDataset::from_ordered(kept)
}

/// Headline figures: `latest` from the full dataset, `average` and `peak`
/// from the selected subset.
pub fn summarize(full: &SeriesDataset, filtered: &SeriesDataset) -> Result<Summary, AppError> {
    let latest = full.last().ok_or_else(|| {
        AppError::new(ErrorKind::EmptyDataset, "Cannot summarize an empty dataset.")
    })?;

    let peak = peak_of(filtered.observations()).ok_or_else(|| {
        AppError::new(ErrorKind::EmptyDataset, "No observations in the selected range.")
    })?;

    let count = filtered.len();
    let average = filtered.iter().map(|o| o.value).sum::<f64>() / count as f64;

    Ok(Summary {
        latest: latest.value,
        latest_date: latest.date,
        average,
        peak: peak.value,
        peak_date: peak.date,
        count,
    })
}

/// Maximum value; the earliest observation wins ties.
fn peak_of(obs: &[Observation]) -> Option<&Observation> {
    obs.iter().fold(None, |best: Option<&Observation>, o| match best {
        Some(b) if b.value >= o.value => Some(b),
        _ => Some(o),
    })
}
