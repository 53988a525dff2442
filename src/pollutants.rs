/// Pollutant registry for the air quality service.
///
/// Defines every pollutant the service reads from the endpoint, along with
/// its display metadata and the breakpoints used to bucket a concentration
/// into a severity ordinal. This is the single source of truth for
/// thresholds; other modules look pollutants up here rather than hardcoding
/// numbers.

use crate::model::Pollutant;

// ---------------------------------------------------------------------------
// Pollutant metadata
// ---------------------------------------------------------------------------

/// Ascending breakpoints, one per ranked severity level.
///
/// Index `i` is the lower bound (exclusive) of ordinal `i`:
///   excellent, good, fair, inferior, poor
pub type Thresholds = [f64; 5];

/// Metadata for a single pollutant.
pub struct PollutantInfo {
    pub pollutant: Pollutant,
    /// Human-readable name, used in logs and the endpoint check report.
    pub name: &'static str,
    /// Concentration unit the endpoint is expected to report.
    pub unit: &'static str,
    /// Severity breakpoints. `None` for pollutants that are reported but
    /// never contribute to the overall severity.
    pub thresholds: Option<Thresholds>,
}

/// All pollutants the service understands, in the order the endpoint
/// usually lists them.
pub static POLLUTANT_REGISTRY: &[PollutantInfo] = &[
    PollutantInfo {
        pollutant: Pollutant::Pm10,
        name: "Particulate matter 10",
        unit: "µg/m³",
        thresholds: Some([0.0, 20.0, 40.0, 75.0, 100.0]),
    },
    PollutantInfo {
        pollutant: Pollutant::Pm25,
        name: "Particulate matter 2.5",
        unit: "µg/m³",
        thresholds: Some([0.0, 15.0, 30.0, 50.0, 70.0]),
    },
    PollutantInfo {
        pollutant: Pollutant::O3,
        name: "Ozone",
        unit: "µg/m³",
        thresholds: Some([0.0, 40.0, 100.0, 140.0, 180.0]),
    },
    PollutantInfo {
        pollutant: Pollutant::No2,
        name: "Nitrogen dioxide",
        unit: "µg/m³",
        thresholds: Some([0.0, 10.0, 30.0, 100.0, 150.0]),
    },
    PollutantInfo {
        pollutant: Pollutant::So2,
        name: "Sulphur dioxide",
        unit: "µg/m³",
        thresholds: Some([0.0, 2.0, 35.0, 75.0, 185.0]),
    },
    PollutantInfo {
        pollutant: Pollutant::Voc,
        name: "Volatile organic compounds",
        unit: "µg/m³",
        thresholds: None, // no agreed breakpoints; exposed as a raw value only
    },
];

/// Looks up a pollutant's registry entry.
pub fn find_pollutant(pollutant: Pollutant) -> Option<&'static PollutantInfo> {
    POLLUTANT_REGISTRY.iter().find(|p| p.pollutant == pollutant)
}

/// Pollutants that have thresholds and therefore feed the classifier.
pub fn classified_pollutants() -> Vec<Pollutant> {
    POLLUTANT_REGISTRY
        .iter()
        .filter(|p| p.thresholds.is_some())
        .map(|p| p.pollutant)
        .collect()
}

// ---------------------------------------------------------------------------
// Bucketing
// ---------------------------------------------------------------------------

/// Highest index `i` such that `value > thresholds[i]`, or 0 when the value
/// does not exceed the first breakpoint.
pub fn bucket_with(thresholds: &Thresholds, value: f64) -> u8 {
    thresholds
        .iter()
        .rposition(|limit| value > *limit)
        .unwrap_or(0) as u8
}

/// Buckets `value` against the pollutant's registered thresholds.
///
/// Returns `None` for pollutants without thresholds.
pub fn bucket(pollutant: Pollutant, value: f64) -> Option<u8> {
    find_pollutant(pollutant)
        .and_then(|info| info.thresholds.as_ref())
        .map(|thresholds| bucket_with(thresholds, value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
