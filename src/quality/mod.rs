/// Turning raw readings into something a reader can act on.
///
/// Submodules:
/// - `severity`  - worst-pollutant classification into a `SeverityLevel`.
/// - `staleness` - when a cached snapshot must be refreshed.

pub mod severity;
pub mod staleness;
