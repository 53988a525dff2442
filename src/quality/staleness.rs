/// Snapshot staleness detection.
///
/// The coordinator serves cached data until it is older than the polling
/// interval, and never trusts a snapshot whose last refresh failed. This
/// module holds that rule plus the clock abstraction it runs against.
///
/// # Clock injection
/// `needs_refresh_at` accepts a `now: DateTime<Utc>` rather than calling
/// `Utc::now()` internally, and the coordinator reads time through the
/// `Clock` trait. Tests drive time explicitly without sleeping.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::Snapshot;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now" for staleness decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Returns `true` when `snapshot` must be refreshed before it is served.
///
/// A refresh is needed when:
///   - no fetch has ever succeeded,
///   - the last refresh attempt faulted, or
///   - `now - captured_at >= interval`.
///
/// The age comparison is inclusive, so a zero interval makes every completed
/// snapshot immediately stale. A capture time in the future (clock stepped
/// backwards) counts as age zero.
pub fn needs_refresh_at(snapshot: &Snapshot, interval: Duration, now: DateTime<Utc>) -> bool {
    if snapshot.fault {
        return true;
    }
    match snapshot.captured_at {
        None => true,
        Some(captured_at) => age(captured_at, now) >= interval,
    }
}

fn age(captured_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - captured_at).to_std().unwrap_or(Duration::ZERO)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
