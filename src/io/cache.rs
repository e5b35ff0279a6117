//! Reload-on-change cache for the dashboard tables.
//!
//! Entries are keyed by path and validated against the file's modification
//! time and length on every lookup, so an edited or regenerated file is always
//! re-read. Failures are never cached, and neither is forecast absence: a
//! forecast produced while the dashboard is open shows up on the next refresh.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::domain::{ForecastDataset, ForecastState, SeriesDataset};
use crate::error::AppError;
use crate::io::ingest::{load_forecast, load_historical};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok()?,
            len: meta.len(),
        })
    }
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    historical: HashMap<PathBuf, (FileStamp, SeriesDataset)>,
    forecast: HashMap<PathBuf, (FileStamp, ForecastDataset)>,
    reads: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loads that produced a dataset (cache misses). Failed loads
    /// and an absent forecast do not count.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn historical(&mut self, path: &Path) -> Result<SeriesDataset, AppError> {
        let stamp = FileStamp::of(path);
        if let (Some(stamp), Some((cached, ds))) = (stamp, self.historical.get(path)) {
            if *cached == stamp {
                debug!(path = %path.display(), "historical cache hit");
                return Ok(ds.clone());
            }
        }

        self.historical.remove(path);
        let ds = load_historical(path)?;
        self.reads += 1;
        if let Some(stamp) = stamp {
            self.historical.insert(path.to_path_buf(), (stamp, ds.clone()));
        }
        Ok(ds)
    }

    pub fn forecast(&mut self, path: &Path) -> Result<ForecastState, AppError> {
        let stamp = FileStamp::of(path);
        if let (Some(stamp), Some((cached, ds))) = (stamp, self.forecast.get(path)) {
            if *cached == stamp {
                debug!(path = %path.display(), "forecast cache hit");
                return Ok(ForecastState::Loaded(ds.clone()));
            }
        }

        self.forecast.remove(path);
        let state = load_forecast(path)?;
        if let ForecastState::Loaded(ds) = &state {
            self.reads += 1;
            if let Some(stamp) = stamp {
                self.forecast.insert(path.to_path_buf(), (stamp, ds.clone()));
            }
        }
        Ok(state)
    }
}
