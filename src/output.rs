//! Presentation of a [`ChartViewState`]: labels, chart series, console output.

use serde::Serialize;
use tracing::{debug, error};

use crate::model::DATE_FORMAT;
use crate::view_model::{ChartView, ChartViewState};

/// Upper y bound used when there is no data to scale against.
const DEFAULT_Y_MAX: usize = 10;

/// Text shown around the chart. Each label is empty when its data is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartLabels {
    pub date_range: String,
    pub fastest: String,
    pub closest: String,
    pub average_size: String,
}

impl ChartLabels {
    pub fn from_state(state: &ChartViewState) -> Self {
        let date_range = format!(
            "{} -> {}",
            state.start_date.format(DATE_FORMAT),
            state.end_date.format(DATE_FORMAT)
        );

        let fastest = if state.fastest_asteroid_name.is_empty() {
            String::new()
        } else {
            format!(
                "Fastest Asteroid: {} at {} km/h",
                state.fastest_asteroid_name, state.fastest_asteroid_speed as i64
            )
        };

        let closest = if state.closest_asteroid_name.is_empty() {
            String::new()
        } else {
            format!(
                "Closest Asteroid: {} at {} km",
                state.closest_asteroid_name, state.closest_asteroid_distance as i64
            )
        };

        let average_size = match state.average_asteroid_size {
            Some(avg) if avg != 0.0 => format!("Average Size: {avg} km"),
            _ => String::new(),
        };

        Self {
            date_range,
            fastest,
            closest,
            average_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub count: usize,
}

/// Plot-ready per-day series with y-axis bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub points: Vec<ChartPoint>,
    pub y_min: usize,
    pub y_max: usize,
}

impl ChartSeries {
    /// Pairs each count with its date. The y range spans the lowest count to
    /// two above the highest.
    pub fn from_state(state: &ChartViewState) -> Self {
        let points = state
            .range()
            .days()
            .zip(&state.asteroids_per_day)
            .map(|(day, &count)| ChartPoint {
                date: day.format(DATE_FORMAT).to_string(),
                count,
            })
            .collect();

        let counts = &state.asteroids_per_day;
        Self {
            points,
            y_min: counts.iter().copied().min().unwrap_or(0),
            y_max: counts.iter().copied().max().map_or(DEFAULT_Y_MAX, |m| m + 2),
        }
    }
}

/// Renders the chart as plain text: one bar per day followed by the labels.
pub fn render_text(state: &ChartViewState) -> String {
    let labels = ChartLabels::from_state(state);
    let series = ChartSeries::from_state(state);

    let mut out = String::new();
    out.push_str(&labels.date_range);
    out.push('\n');

    if state.is_loading {
        out.push_str("(loading)\n");
    }

    for point in &series.points {
        out.push_str(&format!(
            "{} | {:<width$} {}\n",
            point.date,
            "#".repeat(point.count),
            point.count,
            width = series.y_max
        ));
    }

    for line in [&labels.fastest, &labels.closest, &labels.average_size] {
        if !line.is_empty() {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

/// [`ChartView`] that writes each finished chart to stdout.
///
/// Loading frames are only logged. With `json` set the state is printed as
/// JSON instead of the text chart.
#[derive(Debug, Default)]
pub struct ConsoleView {
    pub json: bool,
    pub rendered: usize,
}

impl ConsoleView {
    /// Text written for `state`, or `None` for a loading frame.
    pub fn format(&self, state: &ChartViewState) -> Option<String> {
        if state.is_loading {
            return None;
        }
        if !self.json {
            return Some(render_text(state));
        }
        match serde_json::to_string_pretty(state) {
            Ok(json) => Some(json + "\n"),
            Err(e) => {
                error!(error = %e, "Failed to serialize chart state");
                None
            }
        }
    }
}

impl ChartView for ConsoleView {
    fn render(&mut self, state: &ChartViewState) {
        self.rendered += 1;
        match self.format(state) {
            Some(out) => print!("{out}"),
            None => debug!(start = %state.start_date, end = %state.end_date, "Loading chart"),
        }
    }
}
