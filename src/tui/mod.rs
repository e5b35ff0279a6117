//! Ratatui-based terminal dashboard.
//!
//! Layout: KPI header, historical trend chart for the selected years, the
//! forecast chart (or a not-available notice), and a key/status footer.

use std::io;
use std::time::Duration;

use chrono::Datelike;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use plotters::style::RGBColor;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};
use tracing::warn;

use crate::app::pipeline::{self, DashboardView};
use crate::domain::{DashConfig, DateRange, ForecastState, SeriesDataset};
use crate::error::{AppError, ErrorKind};
use crate::io::DatasetCache;
use crate::report::FORECAST_MISSING;

mod plotters_chart;

use plotters_chart::LinePlottersChart;

/// Start the TUI.
pub fn run(config: DashConfig) -> Result<(), AppError> {
    // Load before touching the terminal so a hard failure prints normally.
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).map_err(|e| terminal_err("initialize terminal", e))?;

    app.event_loop(&mut terminal)
}

fn terminal_err(what: &str, e: io::Error) -> AppError {
    AppError::new(ErrorKind::Terminal, format!("Failed to {what}: {e}"))
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| terminal_err("enable raw mode", e))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(terminal_err("enter alternate screen", e));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Which bound the arrow keys move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

struct App {
    config: DashConfig,
    cache: DatasetCache,
    view: DashboardView,
    selected: Bound,
    status: String,
}

impl App {
    fn new(config: DashConfig) -> Result<Self, AppError> {
        let mut cache = DatasetCache::new();
        let view = pipeline::refresh(&mut cache, &config)?;
        let status = format!("Loaded {} observations.", view.full.len());
        Ok(Self {
            config,
            cache,
            view,
            selected: Bound::Start,
            status,
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| terminal_err("draw", e))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| terminal_err("poll events", e))? {
                continue;
            }

            match event::read().map_err(|e| terminal_err("read event", e))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                self.selected = match self.selected {
                    Bound::Start => Bound::End,
                    Bound::End => Bound::Start,
                };
            }
            KeyCode::Left => self.shift_bound(-1),
            KeyCode::Right => self.shift_bound(1),
            KeyCode::Char('a') => self.select(self.view.span),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    fn shift_bound(&mut self, delta: i32) {
        let range = self.view.range;
        let moved = match self.selected {
            Bound::Start => range.with_start(range.start_year().saturating_add(delta)),
            Bound::End => range.with_end(range.end_year().saturating_add(delta)),
        };
        // Keep the slider inside the data, as the selection has no meaning outside it.
        let Some(clamped) = moved.clamp_to(self.view.span) else {
            return;
        };
        self.select(clamped);
    }

    fn select(&mut self, range: DateRange) {
        match pipeline::reselect(&self.view, range) {
            Ok(view) => {
                self.view = view;
                self.config.start_year = Some(range.start_year());
                self.config.end_year = Some(range.end_year());
                self.status = format!("Selected {range}.");
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn reload(&mut self) {
        let reads = self.cache.reads();
        let had_forecast = has_forecast(&self.view);
        match pipeline::refresh(&mut self.cache, &self.config) {
            Ok(view) => {
                let changed = self.cache.reads() > reads || has_forecast(&view) != had_forecast;
                self.view = view;
                self.status = if changed {
                    "Reloaded changed files.".to_string()
                } else {
                    "Files unchanged.".to_string()
                };
            }
            Err(err) => {
                warn!("reload failed: {err}");
                self.status = format!("Reload failed: {err}");
            }
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("udash", Style::default().fg(Color::Cyan)),
            Span::raw(" | U.S. Unemployment Rate (BLS)"),
        ]));

        let marker = |b: Bound| if self.selected == b { "»" } else { " " };
        lines.push(Line::from(Span::styled(
            format!(
                "data: {} | {}start: {} {}end: {}",
                self.view.span,
                marker(Bound::Start),
                self.view.range.start_year(),
                marker(Bound::End),
                self.view.range.end_year(),
            ),
            Style::default().fg(Color::Gray),
        )));

        match &self.view.summary {
            Some(s) => {
                lines.push(Line::from(vec![
                    Span::raw("Latest: "),
                    Span::styled(format!("{:.2}%", s.latest), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(format!(" ({})", s.latest_date.format("%Y-%m"))),
                ]));
                lines.push(Line::from(vec![
                    Span::raw("Average (selected): "),
                    Span::styled(format!("{:.2}%", s.average), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" | Peak (selected): "),
                    Span::styled(format!("{:.2}%", s.peak), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(format!(" ({})", s.peak_date.format("%Y-%m"))),
                ]));
            }
            None => lines.push(Line::from(Span::styled(
                "No observations in the selected period.",
                Style::default().fg(Color::Yellow),
            ))),
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);

        self.draw_history(frame, chunks[0]);
        self.draw_forecast(frame, chunks[1]);
    }

    fn draw_history(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title("Unemployment Rate Over Time")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let series = history_series(&self.view.filtered);
        if series.is_empty() {
            let msg = Paragraph::new("No observations in the selected period.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let (x_bounds, y_bounds) = bounds(&series);
        frame.render_widget(
            LinePlottersChart {
                series: &series,
                markers: series.len() == 1,
                color: RGBColor(0, 255, 255),
                x_bounds,
                y_bounds,
                x_label: "year",
                y_label: "rate (%)",
                fmt_x: fmt_year,
                fmt_y: fmt_rate,
            },
            inner,
        );
    }

    fn draw_forecast(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = crate::report::forecast_title(&self.view.forecast);
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let forecast = match &self.view.forecast {
            Ok(ForecastState::Loaded(ds)) => ds,
            Ok(ForecastState::Absent) => {
                let msg = Paragraph::new(FORECAST_MISSING)
                    .style(Style::default().fg(Color::Yellow))
                    .wrap(ratatui::widgets::Wrap { trim: true });
                frame.render_widget(msg, inner);
                return;
            }
            Err(err) => {
                let msg = Paragraph::new(format!("Forecast could not be loaded: {err}"))
                    .style(Style::default().fg(Color::Red))
                    .wrap(ratatui::widgets::Wrap { trim: true });
                frame.render_widget(msg, inner);
                return;
            }
        };

        let series: Vec<(f64, f64)> = forecast
            .points()
            .iter()
            .map(|p| (p.months_ahead as f64, p.predicted_value))
            .collect();
        let (x_bounds, y_bounds) = bounds(&series);
        frame.render_widget(
            LinePlottersChart {
                series: &series,
                markers: true,
                color: RGBColor(255, 165, 0),
                x_bounds,
                y_bounds,
                x_label: "months ahead",
                y_label: "predicted (%)",
                fmt_x: fmt_months,
                fmt_y: fmt_rate,
            },
            inner,
        );
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select bound  ←/→ adjust year  a all years  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn history_series(dataset: &SeriesDataset) -> Vec<(f64, f64)> {
    dataset
        .iter()
        .map(|o| (o.date.year() as f64 + o.date.month0() as f64 / 12.0, o.value))
        .collect()
}

/// Chart bounds with a little vertical padding; degenerate spans are widened.
fn bounds(series: &[(f64, f64)]) -> ([f64; 2], [f64; 2]) {
    let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in series {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    }

    if !x0.is_finite() || !x1.is_finite() {
        (x0, x1) = (0.0, 1.0);
    } else if x1 <= x0 {
        (x0, x1) = (x0 - 0.5, x1 + 0.5);
    }
    if !y0.is_finite() || !y1.is_finite() {
        (y0, y1) = (0.0, 1.0);
    } else if y1 <= y0 {
        (y0, y1) = (y0 - 0.5, y1 + 0.5);
    }

    let pad = ((y1 - y0) * 0.05).max(1e-12);
    ([x0, x1], [y0 - pad, y1 + pad])
}

fn fmt_year(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_months(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_rate(v: f64) -> String {
    format!("{v:.1}")
}

fn has_forecast(view: &DashboardView) -> bool {
    matches!(view.forecast, Ok(ForecastState::Loaded(_)))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::Observation;

    fn app(dir: &TempDir) -> App {
        let historical_path = dir.path().join("hist.csv");
        fs::write(
            &historical_path,
            "date,value\n2019-06-01,3.6\n2020-04-01,14.7\n2021-01-01,6.3\n2022-01-01,4.0\n",
        )
        .unwrap();
        App::new(DashConfig {
            historical_path,
            forecast_path: dir.path().join("fc.csv"),
            ..DashConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn arrow_keys_move_the_selected_bound_within_the_data() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        app.handle_key(KeyCode::Right);
        assert_eq!(app.view.range, DateRange::new(2020, 2022).unwrap());
        assert_eq!(app.view.summary.as_ref().unwrap().peak, 14.7);

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Left);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.view.range, DateRange::new(2020, 2020).unwrap());
        assert_eq!(app.view.summary.as_ref().unwrap().count, 1);

        // Cannot leave the data span.
        app.handle_key(KeyCode::Char('a'));
        app.handle_key(KeyCode::Right);
        assert_eq!(app.view.range, DateRange::new(2019, 2022).unwrap());
    }

    #[test]
    fn reload_picks_up_a_new_forecast() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        assert_eq!(app.view.forecast.as_ref().unwrap(), &ForecastState::Absent);

        fs::write(dir.path().join("fc.csv"), "months_ahead,predicted_value\n1,4.1\n2,4.2\n").unwrap();
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.status, "Reloaded changed files.");
        let horizon = app.view.forecast.as_ref().unwrap().dataset().unwrap().horizon();
        assert_eq!(horizon, 2);

        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn reload_without_changes_reports_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.status, "Files unchanged.");
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.status, "Files unchanged.");

        let fc = dir.path().join("fc.csv");
        fs::write(&fc, "months_ahead,predicted_value\n1,4.1\n").unwrap();
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.status, "Reloaded changed files.");
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.status, "Files unchanged.");

        fs::remove_file(&fc).unwrap();
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.status, "Reloaded changed files.");
        assert_eq!(app.view.forecast.as_ref().unwrap(), &ForecastState::Absent);
    }

    #[test]
    fn bounds_widen_degenerate_series() {
        let series = history_series(
            &SeriesDataset::from_observations(vec![Observation {
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                value: 4.0,
            }])
            .unwrap(),
        );
        let (x, y) = bounds(&series);
        assert_eq!(x, [2019.5, 2020.5]);
        assert!(y[0] < 3.5 && y[1] > 4.5);
    }
}
