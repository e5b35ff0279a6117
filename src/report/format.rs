//! Formatted terminal output for the dashboard.
//!
//! We keep formatting code in one place so output changes are localized and
//! the TUI can reuse the same wording.

use crate::app::pipeline::DashboardView;
use crate::domain::{DateRange, ForecastDataset, ForecastState, Summary};
use crate::error::AppError;

pub const FORECAST_MISSING: &str = "Forecast data not found. Run the modeling step to generate forecasts.";

/// Header, KPI block and forecast section (plots are rendered separately).
pub fn format_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();

    out.push_str("=== U.S. Unemployment Rate Dashboard ===\n");
    out.push_str("Data source: U.S. Bureau of Labor Statistics (BLS)\n");
    out.push_str(&format!(
        "Data: {} observations, {} | Selected: {}\n\n",
        view.full.len(),
        view.span,
        view.range
    ));

    out.push_str(&format_summary(view.summary.as_ref(), view.range));
    out.push('\n');

    out.push_str(&format!("{}\n", forecast_title(&view.forecast)));
    match &view.forecast {
        Ok(ForecastState::Loaded(ds)) => out.push_str(&format_forecast_table(ds)),
        Ok(ForecastState::Absent) => out.push_str(&format!("{FORECAST_MISSING}\n")),
        Err(err) => out.push_str(&format!("Forecast could not be loaded: {err}\n")),
    }

    out
}

/// The three KPI figures, two decimals each.
pub fn format_summary(summary: Option<&Summary>, range: DateRange) -> String {
    let Some(s) = summary else {
        return format!("No observations in the selected period ({range}).\n");
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Latest Unemployment Rate (%):  {:>6.2}  ({})\n",
        s.latest,
        s.latest_date.format("%Y-%m")
    ));
    out.push_str(&format!(
        "Average Rate (Selected Period): {:>6.2}  ({} months)\n",
        s.average, s.count
    ));
    out.push_str(&format!(
        "Peak Rate (Selected Period):    {:>6.2}  ({})\n",
        s.peak,
        s.peak_date.format("%Y-%m")
    ));
    out
}

pub fn forecast_title(forecast: &Result<ForecastState, AppError>) -> String {
    match forecast {
        Ok(ForecastState::Loaded(ds)) => format!("{}-Month Forecast", ds.horizon()),
        _ => "Forecast".to_string(),
    }
}

pub fn format_forecast_table(forecast: &ForecastDataset) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<14} {:>16}\n", "months_ahead", "predicted_rate"));
    for p in forecast.points() {
        out.push_str(&format!("{:<14} {:>16.2}\n", p.months_ahead, p.predicted_value));
    }
    out
}
