//! Reduction of a decoded feed into chart-ready statistics.
//!
//! [`aggregate::aggregate`] is pure: it reads a [`FeedPayload`](crate::model::FeedPayload)
//! and a date range and produces per-day counts plus the fastest, "closest"
//! and average-size summaries.

pub mod aggregate;
pub mod types;
pub mod utility;
