/// Core data types for the air quality polling service.
///
/// This module defines the shared domain model imported by all other modules:
/// pollutant keys, readings, severity levels, the cached snapshot and the
/// fetch error taxonomy. It contains no I/O.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Pollutant keys
// ---------------------------------------------------------------------------

/// JSON field carrying a pre-computed aggregate index on some endpoints.
pub const AIR_QUALITY_KEY: &str = "air_quality";

/// The fixed set of pollutants the service understands.
///
/// Serialized using the same short keys the endpoint reports them under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm10,
    Pm25,
    O3,
    No2,
    So2,
    Voc,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm10,
        Pollutant::Pm25,
        Pollutant::O3,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::Voc,
    ];

    /// Top-level JSON key for this pollutant.
    pub fn key(self) -> &'static str {
        match self {
            Pollutant::Pm10 => "pm10",
            Pollutant::Pm25 => "pm25",
            Pollutant::O3 => "o3",
            Pollutant::No2 => "no2",
            Pollutant::So2 => "so2",
            Pollutant::Voc => "voc",
        }
    }

    pub fn from_key(key: &str) -> Option<Pollutant> {
        Pollutant::ALL.into_iter().find(|p| p.key() == key)
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// Concentrations parsed from one endpoint response.
///
/// Pollutants missing from the response are simply absent. Every stored
/// value is finite and non-negative; `insert` refuses anything else so a
/// reading can never carry NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollutantReading {
    values: BTreeMap<Pollutant, f64>,
    air_quality: Option<f64>,
}

impl PollutantReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for `pollutant`. Returns `false` and stores nothing if
    /// the value is not a finite, non-negative number.
    pub fn insert(&mut self, pollutant: Pollutant, value: f64) -> bool {
        if !is_valid_concentration(value) {
            return false;
        }
        self.values.insert(pollutant, value);
        true
    }

    /// Builder-style `insert`, convenient in tests and fixtures.
    pub fn with(mut self, pollutant: Pollutant, value: f64) -> Self {
        self.insert(pollutant, value);
        self
    }

    /// Records the endpoint's own aggregate index. Non-finite values are
    /// ignored.
    pub fn set_air_quality(&mut self, index: f64) -> bool {
        if !index.is_finite() {
            return false;
        }
        self.air_quality = Some(index);
        true
    }

    pub fn with_air_quality(mut self, index: f64) -> Self {
        self.set_air_quality(index);
        self
    }

    pub fn get(&self, pollutant: Pollutant) -> Option<f64> {
        self.values.get(&pollutant).copied()
    }

    pub fn air_quality(&self) -> Option<f64> {
        self.air_quality
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, f64)> + '_ {
        self.values.iter().map(|(p, v)| (*p, *v))
    }

    pub fn pollutants(&self) -> impl Iterator<Item = Pollutant> + '_ {
        self.values.keys().copied()
    }

    /// Number of pollutant values held; the aggregate index is not counted.
    pub fn pollutant_count(&self) -> usize {
        self.values.len()
    }

    pub fn has_pollutants(&self) -> bool {
        !self.values.is_empty()
    }
}

fn is_valid_concentration(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Overall air quality, from best to worst, plus `Unknown` when nothing
/// could be classified.
///
/// `Unknown` sits outside the ranking, so there is no `Ord`; compare via
/// `rank()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityLevel {
    Excellent,
    Good,
    Fair,
    Inferior,
    Poor,
    Unknown,
}

impl SeverityLevel {
    /// Ordinal 0..=4 for ranked levels, `None` for `Unknown`.
    pub fn rank(self) -> Option<u8> {
        match self {
            SeverityLevel::Excellent => Some(0),
            SeverityLevel::Good => Some(1),
            SeverityLevel::Fair => Some(2),
            SeverityLevel::Inferior => Some(3),
            SeverityLevel::Poor => Some(4),
            SeverityLevel::Unknown => None,
        }
    }

    /// Maps an ordinal back to a level; anything above 4 is `Unknown`.
    pub fn from_rank(rank: u8) -> SeverityLevel {
        match rank {
            0 => SeverityLevel::Excellent,
            1 => SeverityLevel::Good,
            2 => SeverityLevel::Fair,
            3 => SeverityLevel::Inferior,
            4 => SeverityLevel::Poor,
            _ => SeverityLevel::Unknown,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SeverityLevel::Excellent => "EXCELLENT",
            SeverityLevel::Good => "GOOD",
            SeverityLevel::Fair => "FAIR",
            SeverityLevel::Inferior => "INFERIOR",
            SeverityLevel::Poor => "POOR",
            SeverityLevel::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The cached result of the most recent refresh.
///
/// A snapshot is shared behind an `Arc` and never mutated once published;
/// each refresh produces a whole new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub readings: PollutantReading,
    pub severity: SeverityLevel,
    /// Completion time of the last successful fetch; `None` until one succeeds.
    pub captured_at: Option<DateTime<Utc>>,
    /// Set when the most recent refresh attempt failed.
    pub fault: bool,
}

impl Snapshot {
    /// The startup state: nothing fetched yet.
    pub fn empty() -> Self {
        Snapshot {
            readings: PollutantReading::new(),
            severity: SeverityLevel::Unknown,
            captured_at: None,
            fault: false,
        }
    }

    pub fn captured(readings: PollutantReading, severity: SeverityLevel, at: DateTime<Utc>) -> Self {
        Snapshot {
            readings,
            severity,
            captured_at: Some(at),
            fault: false,
        }
    }

    /// Copy of this snapshot flagged as faulted. Data and capture time are
    /// kept so readers still see the last known values.
    pub fn faulted(&self) -> Self {
        Snapshot {
            fault: true,
            ..self.clone()
        }
    }

    pub fn has_data(&self) -> bool {
        self.captured_at.is_some()
    }

    pub fn value_of(&self, key: ReadKey) -> ReadValue {
        match key {
            ReadKey::AirQuality => ReadValue::Severity(self.severity),
            ReadKey::Pollutant(p) => ReadValue::Concentration(self.readings.get(p)),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::empty()
    }
}

// ---------------------------------------------------------------------------
// Read requests
// ---------------------------------------------------------------------------

/// What a reader asks the coordinator for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadKey {
    AirQuality,
    Pollutant(Pollutant),
}

impl fmt::Display for ReadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadKey::AirQuality => f.write_str(AIR_QUALITY_KEY),
            ReadKey::Pollutant(p) => p.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadValue {
    Severity(SeverityLevel),
    Concentration(Option<f64>),
}

/// A resolved read: the requested value plus the fault flag of the snapshot
/// it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: ReadValue,
    pub fault: bool,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching and parsing endpoint data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Connection failure, timeout or non-2xx status.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The body could not be decoded as a JSON object.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The body decoded but held no usable pollutant values.
    #[error("No usable pollutant data in response")]
    NoUsableData,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
