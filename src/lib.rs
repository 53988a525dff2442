/// airq_service: HTTP air quality sensor polling, caching and classification.
///
/// # Module structure
///
/// ```text
/// airq_service
/// ├── model       - shared data types (Pollutant, PollutantReading, Snapshot, FetchError, …)
/// ├── pollutants  - pollutant registry with severity breakpoints
/// ├── config      - TOML accessory configuration
/// ├── ingest
/// │   ├── http    - Fetch seam, reqwest fetcher, JSON body parsing
/// │   └── fixtures (test only) - representative endpoint payloads
/// ├── quality
/// │   ├── severity  - worst-pollutant classification
/// │   └── staleness - refresh policy and clock injection
/// ├── poll        - cache, in-flight fetch sharing, background refresh
/// ├── host        - accessory getter/fault-status boundary
/// ├── verify      - one-shot endpoint check
/// └── logging     - tracing setup and fetch-failure classification
/// ```

pub mod config;
pub mod host;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod poll;
pub mod pollutants;
pub mod quality;
pub mod verify;
