use crate::analyzers::types::{ChartStats, DateRange, Extremum};
use crate::analyzers::utility::mean;
use crate::model::{Dimension, FeedPayload};

/// Reduces a decoded feed into [`ChartStats`] for `range`.
///
/// Per-day counts cover only the days in `range`; a day missing from the
/// payload counts as zero and an inverted range yields an empty series. The
/// summaries scan every object in the payload, in ascending date-key order
/// and then list order, so ties go to the object met first.
///
/// - fastest: the first close-approach record's km/h velocity of each object.
/// - closest: every close-approach record's miss distance in km, keeping the
///   running *maximum*. The label is historical; the comparison is not a
///   minimum.
/// - average size: mean of each object's kilometre `(min + max) / 2`.
///
/// Objects with no close-approach records still count toward the per-day
/// series and the average size.
pub fn aggregate(payload: &FeedPayload, range: DateRange) -> ChartStats {
    let asteroids_per_day = range
        .days()
        .map(|day| payload.objects_on(day).map_or(0, <[_]>::len))
        .collect();

    let mut fastest = Extremum::default();
    let mut closest = Extremum::default();
    let mut sizes = Vec::with_capacity(payload.object_count());

    for objects in payload.near_earth_objects.values() {
        for neo in objects {
            if let Some(first) = neo.close_approach_data.first() {
                fastest.offer(&neo.name, first.relative_velocity.kilometers_per_hour.value());
            }

            sizes.push(neo.estimated_diameter.get(Dimension::Kilometers).average());

            for approach in &neo.close_approach_data {
                closest.offer(&neo.name, approach.miss_distance.kilometers.value());
            }
        }
    }

    ChartStats {
        asteroids_per_day,
        fastest,
        closest,
        average_size: mean(&sizes),
    }
}
