//! `unemployment-dash` library crate.
//!
//! The binary (`udash`) is a thin wrapper around this library so that:
//!
//! - loading, filtering and summary logic is testable without spawning processes
//! - the BLS fetcher and the table loaders are reusable outside the dashboard

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
