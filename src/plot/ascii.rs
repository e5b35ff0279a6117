//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - series line: `-`
//! - forecast points: `o`

use chrono::Datelike;

use crate::domain::{ForecastDataset, SeriesDataset};

/// Trend line of the (already filtered) historical series.
pub fn render_history_plot(dataset: &SeriesDataset, width: usize, height: usize) -> String {
    let (Some(first), Some(last)) = (dataset.first(), dataset.last()) else {
        return "No observations to plot.\n".to_string();
    };

    let points: Vec<(f64, f64)> = dataset
        .iter()
        .map(|o| (fractional_year(o.date), o.value))
        .collect();

    let header = format!(
        "Plot: {}..{} | rate (%)",
        first.date.format("%Y-%m"),
        last.date.format("%Y-%m")
    );
    render_plot(&header, &points, dataset.len() == 1, width, height)
}

/// Predicted rate by horizon, with each horizon marked.
pub fn render_forecast_plot(forecast: &ForecastDataset, width: usize, height: usize) -> String {
    if forecast.is_empty() {
        return "No forecast points to plot.\n".to_string();
    }

    let points: Vec<(f64, f64)> = forecast
        .points()
        .iter()
        .map(|p| (p.months_ahead as f64, p.predicted_value))
        .collect();

    let header = format!("Plot: months ahead 1..{} | predicted rate (%)", forecast.horizon());
    render_plot(&header, &points, true, width, height)
}

fn fractional_year(date: chrono::NaiveDate) -> f64 {
    date.year() as f64 + (date.month0() as f64) / 12.0
}

fn render_plot(header: &str, points: &[(f64, f64)], markers: bool, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(points);
    let (y_min, y_max) = y_range(points);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    draw_curve(&mut grid, points, x_min, x_max, y_min, y_max);

    if markers {
        for &(x, y) in points {
            let col = map_x(x, x_min, x_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][col] = 'o';
        }
    }

    let mut out = String::new();
    out.push_str(&format!("{header} | y=[{y_min:.2}, {y_max:.2}]\n"));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn x_range(points: &[(f64, f64)]) -> (f64, f64) {
    let (min, max) = min_max(points.iter().map(|&(x, _)| x));
    if max > min { (min, max) } else { (min - 0.5, min + 0.5) }
}

fn y_range(points: &[(f64, f64)]) -> (f64, f64) {
    let (min, max) = min_max(points.iter().map(|&(_, y)| y));
    if max > min { (min, max) } else { (min - 0.5, min + 0.5) }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min.is_finite() && max.is_finite() { (min, max) } else { (0.0, 1.0) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, x_min, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{ForecastPoint, Observation};

    #[test]
    fn forecast_plot_golden_snapshot_small() {
        let forecast = ForecastDataset::from_points(vec![
            ForecastPoint { months_ahead: 1, predicted_value: 4.0 },
            ForecastPoint { months_ahead: 2, predicted_value: 4.1 },
            ForecastPoint { months_ahead: 3, predicted_value: 4.3 },
        ])
        .unwrap();

        let txt = render_forecast_plot(&forecast, 10, 5);
        let body: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(
            body,
            [
                "         o",
                "       -- ",
                "      -   ",
                "   --o    ",
                "o--       ",
            ]
        );
        assert!(txt.starts_with("Plot: months ahead 1..3"));
    }

    #[test]
    fn history_plot_spans_full_width() {
        let ds = SeriesDataset::from_observations(vec![
            Observation { date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), value: 3.5 },
            Observation { date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(), value: 3.5 },
        ])
        .unwrap();

        let txt = render_history_plot(&ds, 12, 5);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Plot: 2020-01..2021-01"));
        // Flat series sits in the middle row.
        assert_eq!(lines[3], "------------");
    }

    #[test]
    fn empty_inputs_render_a_notice() {
        assert_eq!(render_history_plot(&SeriesDataset::default(), 20, 5), "No observations to plot.\n");
    }
}
