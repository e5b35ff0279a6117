//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - historical series export (`export`)
//! - reload-on-change cache over the ingest functions (`cache`)

pub mod cache;
pub mod export;
pub mod ingest;

pub use cache::DatasetCache;
pub use export::*;
pub use ingest::*;
