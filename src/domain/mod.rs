//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - monthly observations and the ordered `SeriesDataset`
//! - forecast points and the optional `ForecastState`
//! - year ranges, summary figures, and dashboard configuration

pub mod types;

pub use types::*;
