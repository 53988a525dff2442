/// Endpoint ingestion.
///
/// Submodules:
/// - `http`     - the `Fetch` seam, the reqwest-backed fetcher and body parsing.
/// - `fixtures` - representative endpoint payloads (test only).

pub mod http;

#[cfg(test)]
pub(crate) mod fixtures;

pub use http::{Fetch, HttpFetcher, parse_readings};
