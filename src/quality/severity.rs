//! Overall air quality classification.
//!
//! The worst pollutant dominates: each classified pollutant is bucketed
//! against its registry thresholds and the highest bucket wins. An endpoint
//! that already reports an aggregate `air_quality` index short-circuits the
//! computation entirely.

use crate::model::{PollutantReading, SeverityLevel};
use crate::pollutants;

/// Classifies a set of readings into a single severity level.
///
/// Returns `Unknown` when the readings carry neither an aggregate index nor
/// any pollutant with thresholds.
pub fn classify(readings: &PollutantReading) -> SeverityLevel {
    if let Some(index) = readings.air_quality() {
        return severity_from_index(index);
    }

    readings
        .iter()
        .filter_map(|(pollutant, value)| pollutants::bucket(pollutant, value))
        .max()
        .map(SeverityLevel::from_rank)
        .unwrap_or(SeverityLevel::Unknown)
}

/// Maps an endpoint-supplied aggregate index onto a level.
///
/// The index is rounded to the nearest ordinal; anything outside 0..=4 is
/// `Unknown`.
pub fn severity_from_index(index: f64) -> SeverityLevel {
    if !index.is_finite() {
        return SeverityLevel::Unknown;
    }
    let rounded = index.round();
    if (0.0..=4.0).contains(&rounded) {
        SeverityLevel::from_rank(rounded as u8)
    } else {
        SeverityLevel::Unknown
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
