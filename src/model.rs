//! Typed representation of the NEO feed response.
//!
//! The feed sends snake_case keys, which are also the Rust field names, so
//! every struct here decodes with serde's default naming and no per-field
//! renames. Unknown keys (such as `links`) are ignored.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Date-key format used both on the wire and in `near_earth_objects`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Top-level feed response: element count plus objects grouped by date key.
///
/// Dates with no objects are absent from the map. Keys iterate in ascending
/// date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPayload {
    pub element_count: u64,
    pub near_earth_objects: BTreeMap<String, Vec<NearEarthObject>>,
}

impl FeedPayload {
    /// Total number of objects across all dates.
    pub fn object_count(&self) -> usize {
        self.near_earth_objects.values().map(Vec::len).sum()
    }

    /// Objects listed under `date`, if any.
    pub fn objects_on(&self, date: NaiveDate) -> Option<&[NearEarthObject]> {
        self.near_earth_objects
            .get(&date.format(DATE_FORMAT).to_string())
            .map(Vec::as_slice)
    }

    /// Earliest and latest date keys that parse as dates.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self
            .near_earth_objects
            .keys()
            .filter_map(|k| NaiveDate::parse_from_str(k, DATE_FORMAT).ok());
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some((min, max))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearEarthObject {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neo_reference_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nasa_jpl_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_magnitude_h: Option<f64>,
    pub estimated_diameter: EstimatedDiameterSet,
    pub is_potentially_hazardous_asteroid: bool,
    pub is_sentry_object: bool,
    pub close_approach_data: Vec<CloseApproachRecord>,
}

/// Unit keys of `estimated_diameter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Kilometers,
    Meters,
    Miles,
    Feet,
}

/// Diameter estimate in every unit. All four units are required on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedDiameterSet {
    pub kilometers: DiameterRange,
    pub meters: DiameterRange,
    pub miles: DiameterRange,
    pub feet: DiameterRange,
}

impl EstimatedDiameterSet {
    pub fn get(&self, unit: Dimension) -> &DiameterRange {
        match unit {
            Dimension::Kilometers => &self.kilometers,
            Dimension::Meters => &self.meters,
            Dimension::Miles => &self.miles,
            Dimension::Feet => &self.feet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiameterRange {
    pub estimated_diameter_min: f64,
    pub estimated_diameter_max: f64,
}

impl DiameterRange {
    pub fn average(&self) -> f64 {
        (self.estimated_diameter_min + self.estimated_diameter_max) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseApproachRecord {
    pub close_approach_date: String,
    pub close_approach_date_full: String,
    pub epoch_date_close_approach: u64,
    pub relative_velocity: RelativeVelocity,
    pub miss_distance: MissDistance,
    pub orbiting_body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeVelocity {
    pub kilometers_per_second: NumericString,
    pub kilometers_per_hour: NumericString,
    pub miles_per_hour: NumericString,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissDistance {
    pub astronomical: NumericString,
    pub lunar: NumericString,
    pub kilometers: NumericString,
    pub miles: NumericString,
}

/// A decimal number the feed encodes as a JSON string.
///
/// The text is validated when decoded, so aggregation never meets a value it
/// cannot compare. The raw text is kept so re-encoding is lossless.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericString {
    raw: String,
    value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected a finite decimal string, got '{0}'")]
pub struct NumericStringError(String);

impl NumericString {
    pub fn parse(raw: impl Into<String>) -> Result<Self, NumericStringError> {
        let raw = raw.into();
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self { raw, value }),
            _ => Err(NumericStringError(raw)),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Serialize for NumericString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for NumericString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NumericString::parse(raw).map_err(de::Error::custom)
    }
}
