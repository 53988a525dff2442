/// Structured logging for the air quality service
///
/// Thin layer over `tracing`: subscriber setup for the daemon plus
/// fetch-failure classification, so connectivity problems (logged as errors)
/// can be told apart from an endpoint that answers with unusable data
/// (logged as warnings).

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::model::{FetchError, Snapshot};

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    /// A global subscriber was already installed.
    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Installs the global subscriber.
///
/// `default_level` is an `EnvFilter` directive (e.g. `"info"` or
/// `"airq_service=debug"`) used when `RUST_LOG` is unset. When `log_file` is
/// given, output is appended there instead of stderr.
pub fn init(default_level: &str, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    }
    .map_err(|e| LoggingError::Init(e.to_string()))
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Unexpected failure - endpoint unreachable or speaking something we can't read
    Unexpected,
    /// Unknown - endpoint reachable but returned nothing usable, may be warming up
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a fetch failure.
pub fn classify_fetch_failure(err: &FetchError) -> FailureType {
    match err {
        FetchError::Transport(_) | FetchError::Parse(_) => FailureType::Unexpected,
        FetchError::NoUsableData => FailureType::Unknown,
    }
}

/// Short label for the error family, logged as a field.
pub fn failure_kind(err: &FetchError) -> &'static str {
    match err {
        FetchError::Transport(_) => "transport",
        FetchError::Parse(_) => "parse",
        FetchError::NoUsableData => "no_usable_data",
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a fetch failure at the level its classification calls for.
pub fn log_fetch_failure(endpoint: &str, err: &FetchError) {
    let failure_type = classify_fetch_failure(err);
    let kind = failure_kind(err);

    match failure_type {
        FailureType::Unexpected => {
            error!(endpoint, kind, %failure_type, "fetch failed: {}", err)
        }
        FailureType::Unknown => {
            warn!(endpoint, kind, %failure_type, "fetch failed: {}", err)
        }
    }
}

/// Log a freshly installed snapshot.
pub fn log_snapshot(endpoint: &str, snapshot: &Snapshot) {
    let pollutants: Vec<String> = snapshot
        .readings
        .iter()
        .map(|(p, v)| format!("{}={}", p, v))
        .collect();

    debug!(
        endpoint,
        severity = %snapshot.severity,
        pollutants = %pollutants.join(" "),
        aggregate = ?snapshot.readings.air_quality(),
        "snapshot updated"
    );
}

/// Log the outcome of a background refresh tick.
pub fn log_refresh_tick(endpoint: &str, snapshot: &Snapshot) {
    if snapshot.fault {
        warn!(endpoint, severity = %snapshot.severity, "refresh tick left snapshot faulted");
    } else {
        info!(endpoint, severity = %snapshot.severity, "air quality {}", snapshot.severity);
    }
}
