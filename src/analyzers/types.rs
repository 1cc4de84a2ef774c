//! Data types used by the aggregation pipeline.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::FeedError;

/// Inclusive calendar range selected for the chart.
///
/// An inverted range (end before start) is representable; it spans zero days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Like [`DateRange::new`], but rejects an inverted range.
    pub fn checked(start: NaiveDate, end: NaiveDate) -> Result<Self, FeedError> {
        if end < start {
            return Err(FeedError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The seven days ending yesterday: `today - 7 ..= today - 1`.
    pub fn trailing_week(today: NaiveDate) -> Self {
        Self {
            start: today - Days::new(7),
            end: today - Days::new(1),
        }
    }

    /// Number of days in the range, counting both ends. Zero when inverted.
    pub fn day_span(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    /// Every day in the range, in ascending order.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.day_span())
    }
}

/// The object holding a running maximum, and that maximum.
///
/// The default (empty name, zero value) stands for "no object seen".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extremum {
    pub name: String,
    pub value: f64,
}

impl Extremum {
    /// Replaces the current holder if `value` is strictly greater.
    pub(crate) fn offer(&mut self, name: &str, value: f64) {
        if value > self.value {
            self.value = value;
            self.name = name.to_string();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// Result of [`aggregate`](super::aggregate::aggregate).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartStats {
    /// One count per day of the range, index 0 is the start date.
    pub asteroids_per_day: Vec<usize>,
    /// Highest first-approach velocity, km/h.
    pub fastest: Extremum,
    /// Largest miss distance over all approach records, km.
    pub closest: Extremum,
    /// Mean of the per-object kilometre diameter averages. `None` when the
    /// payload holds no objects.
    pub average_size: Option<f64>,
}
