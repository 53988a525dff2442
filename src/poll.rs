//! Poll coordinator: the cache, staleness clock and in-flight fetch for one
//! endpoint.
//!
//! Every reader goes through [`PollCoordinator::read`]. A fresh snapshot is
//! served straight from the cache. A stale one triggers a fetch, unless one
//! is already running, in which case the reader joins it. However many
//! readers arrive during the window, at most one request is outstanding and
//! all of them resolve with the same `Arc<Snapshot>`.
//!
//! The snapshot slot and the in-flight slot live behind a single mutex that
//! is never held across an await. The fetch itself runs as a spawned task
//! wrapped in a [`Shared`] future, so it completes and installs its result
//! even if the reader that started it is dropped.
//!
//! Cache states:
//!
//! ```text
//! EMPTY ──> FETCHING ──> FRESH ──(interval elapses)──> STALE
//!              ^            |                            |
//!              └────────────┴────────────────────────────┘
//! ```
//!
//! A failed fetch keeps the previous readings, sets `fault` and leaves the
//! capture time alone, so the next read retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::ingest::Fetch;
use crate::logging;
use crate::model::{ReadKey, Reading, Snapshot};
use crate::quality::severity::classify;
use crate::quality::staleness::{self, Clock, SystemClock};

type PendingFetch = Shared<BoxFuture<'static, Arc<Snapshot>>>;

/// Observable state of the cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Nothing fetched successfully yet and no fetch running.
    Empty,
    /// A fetch is in flight.
    Fetching,
    /// Cached data is within the polling interval.
    Fresh,
    /// Cached data is past the polling interval or the last refresh faulted.
    Stale,
}

struct CacheState {
    snapshot: Arc<Snapshot>,
    in_flight: Option<PendingFetch>,
}

/// Everything a spawned fetch task needs, cloned out of the coordinator.
struct FetchContext {
    fetcher: Arc<dyn Fetch>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<CacheState>>,
    fetches: Arc<AtomicU64>,
}

pub struct PollCoordinator {
    fetcher: Arc<dyn Fetch>,
    clock: Arc<dyn Clock>,
    polling_interval: Duration,
    state: Arc<Mutex<CacheState>>,
    fetches: Arc<AtomicU64>,
}

impl PollCoordinator {
    pub fn new(fetcher: Arc<dyn Fetch>, polling_interval: Duration) -> Self {
        Self::with_clock(fetcher, polling_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(
        fetcher: Arc<dyn Fetch>,
        polling_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        PollCoordinator {
            fetcher,
            clock,
            polling_interval,
            state: Arc::new(Mutex::new(CacheState {
                snapshot: Arc::new(Snapshot::empty()),
                in_flight: None,
            })),
            fetches: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.fetcher.endpoint()
    }

    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    /// Resolves one read: the requested field plus the fault flag of the
    /// snapshot it came from. Never fails; with no data at all the value is
    /// `Unknown` (or `None` for a pollutant) with `fault` set.
    pub async fn read(&self, key: ReadKey) -> Reading {
        let snapshot = self.current().await;
        Reading {
            value: snapshot.value_of(key),
            fault: snapshot.fault,
        }
    }

    /// The cached snapshot, refreshed first if it is stale.
    ///
    /// This is the only refresh path; reads and the background loop both come
    /// through here.
    pub async fn current(&self) -> Arc<Snapshot> {
        let pending = {
            let mut state = self.state.lock();
            let now = self.clock.now();

            if !staleness::needs_refresh_at(&state.snapshot, self.polling_interval, now) {
                return Arc::clone(&state.snapshot);
            }

            if let Some(pending) = state.in_flight.clone() {
                debug!(endpoint = self.endpoint(), "joining in-flight fetch");
                pending
            } else {
                let pending = self.start_fetch();
                state.in_flight = Some(pending.clone());
                pending
            }
        };

        pending.await
    }

    /// The cached snapshot as-is, without triggering a refresh.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.lock().snapshot)
    }

    pub fn needs_refresh(&self) -> bool {
        let state = self.state.lock();
        staleness::needs_refresh_at(&state.snapshot, self.polling_interval, self.clock.now())
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.state.lock();
        if state.in_flight.is_some() {
            CacheStatus::Fetching
        } else if !state.snapshot.has_data() {
            CacheStatus::Empty
        } else if staleness::needs_refresh_at(&state.snapshot, self.polling_interval, self.clock.now())
        {
            CacheStatus::Stale
        } else {
            CacheStatus::Fresh
        }
    }

    /// Number of fetches started since construction.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    // Called with the state lock held; must not touch `self.state`.
    fn start_fetch(&self) -> PendingFetch {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(endpoint = self.endpoint(), "starting fetch");

        let context = FetchContext {
            fetcher: Arc::clone(&self.fetcher),
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
            fetches: Arc::clone(&self.fetches),
        };
        let fallback = Arc::clone(&self.state);
        let endpoint = self.endpoint().to_string();

        let task = tokio::spawn(context.run());

        async move {
            match task.await {
                Ok(snapshot) => snapshot,
                Err(join_error) => {
                    // The fetch task panicked before installing anything.
                    error!(endpoint = %endpoint, "fetch task aborted: {}", join_error);
                    let mut state = fallback.lock();
                    let faulted = Arc::new(state.snapshot.faulted());
                    state.snapshot = Arc::clone(&faulted);
                    state.in_flight = None;
                    faulted
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl FetchContext {
    async fn run(self) -> Arc<Snapshot> {
        let outcome = self.fetcher.fetch().await;
        let endpoint = self.fetcher.endpoint();

        if let Err(err) = &outcome {
            logging::log_fetch_failure(endpoint, err);
        }

        let installed = {
            let mut state = self.state.lock();
            let next = match outcome {
                Ok(readings) => {
                    let severity = classify(&readings);
                    Snapshot::captured(readings, severity, self.clock.now())
                }
                Err(_) => state.snapshot.faulted(),
            };
            let next = Arc::new(next);
            state.snapshot = Arc::clone(&next);
            state.in_flight = None;
            next
        };

        if !installed.fault {
            logging::log_snapshot(endpoint, &installed);
        }
        debug!(
            endpoint,
            total_fetches = self.fetches.load(Ordering::Relaxed),
            fault = installed.fault,
            "fetch resolved"
        );
        installed
    }
}

// ---------------------------------------------------------------------------
// Background refresh
// ---------------------------------------------------------------------------

/// Spawns the periodic refresh task.
///
/// Each tick goes through [`PollCoordinator::current`], so a tick racing a
/// reader joins the same fetch rather than starting a second one, and a tick
/// that finds the cache fresh does nothing. Returns `None` when the polling
/// interval is zero.
pub fn spawn_refresh_loop(coordinator: Arc<PollCoordinator>) -> Option<JoinHandle<()>> {
    let interval = coordinator.polling_interval();
    if interval.is_zero() {
        debug!(endpoint = coordinator.endpoint(), "polling interval is 0, no background refresh");
        return None;
    }

    Some(tokio::spawn(async move {
        loop {
            let snapshot = coordinator.current().await;
            logging::log_refresh_tick(coordinator.endpoint(), &snapshot);
            tokio::time::sleep(interval).await;
        }
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FetchError, Pollutant, PollutantReading, ReadValue, SeverityLevel};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    struct FixedFetcher {
        result: Result<PollutantReading, FetchError>,
    }

    #[async_trait]
    impl Fetch for FixedFetcher {
        async fn fetch(&self) -> Result<PollutantReading, FetchError> {
            self.result.clone()
        }
    }

    struct FrozenClock(DateTime<Utc>);

    impl Clock for FrozenClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn coordinator(result: Result<PollutantReading, FetchError>) -> PollCoordinator {
        PollCoordinator::with_clock(
            Arc::new(FixedFetcher { result }),
            Duration::from_secs(300),
            Arc::new(FrozenClock(Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap())),
        )
    }

    #[tokio::test]
    async fn test_new_coordinator_is_empty_and_needs_refresh() {
        let c = coordinator(Err(FetchError::NoUsableData));
        assert_eq!(c.status(), CacheStatus::Empty);
        assert!(c.needs_refresh());
        assert_eq!(c.fetch_count(), 0);
        assert_eq!(*c.snapshot(), Snapshot::empty());
    }

    #[tokio::test]
    async fn test_successful_read_classifies_and_caches() {
        let c = coordinator(Ok(PollutantReading::new().with(Pollutant::Pm25, 80.0)));

        let reading = c.read(ReadKey::AirQuality).await;
        assert_eq!(reading.value, ReadValue::Severity(SeverityLevel::Poor));
        assert!(!reading.fault);
        assert_eq!(c.status(), CacheStatus::Fresh);

        let pm25 = c.read(ReadKey::Pollutant(Pollutant::Pm25)).await;
        assert_eq!(pm25.value, ReadValue::Concentration(Some(80.0)));
        assert_eq!(c.fetch_count(), 1, "second read is served from cache");
    }

    #[tokio::test]
    async fn test_first_fetch_failure_resolves_unknown_with_fault() {
        let c = coordinator(Err(FetchError::Transport("connection refused".into())));

        let reading = c.read(ReadKey::AirQuality).await;
        assert_eq!(reading.value, ReadValue::Severity(SeverityLevel::Unknown));
        assert!(reading.fault);

        let pm10 = c.read(ReadKey::Pollutant(Pollutant::Pm10)).await;
        assert_eq!(pm10.value, ReadValue::Concentration(None));
        assert!(pm10.fault);
        assert_eq!(c.fetch_count(), 2, "a faulted cache is retried on every read");
        assert_eq!(c.status(), CacheStatus::Empty);
    }

    #[tokio::test]
    async fn test_zero_interval_refetches_after_each_completed_fetch() {
        let c = PollCoordinator::with_clock(
            Arc::new(FixedFetcher {
                result: Ok(PollutantReading::new().with(Pollutant::O3, 10.0)),
            }),
            Duration::ZERO,
            Arc::new(FrozenClock(Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap())),
        );
        c.read(ReadKey::AirQuality).await;
        c.read(ReadKey::AirQuality).await;
        c.read(ReadKey::AirQuality).await;
        assert_eq!(c.fetch_count(), 3);
        assert!(spawn_refresh_loop(Arc::new(c)).is_none());
    }
}
