//! Endpoint Verification Module
//!
//! One-shot check of a configured endpoint: fetch once, report which
//! expected pollutants came back, what the aggregate index and computed
//! severity are, and why it failed if it did.
//!
//! Use this before wiring a new sensor into the host.

use chrono::Utc;
use serde::Serialize;

use crate::ingest::Fetch;
use crate::logging;
use crate::model::{Pollutant, SeverityLevel};
use crate::quality::severity::classify;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct EndpointVerification {
    pub timestamp: String,
    pub endpoint: String,
    pub status: VerificationStatus,
    pub pollutants_expected: Vec<Pollutant>,
    pub pollutants_available: Vec<Pollutant>,
    pub pollutants_missing: Vec<Pollutant>,
    pub air_quality_index: Option<f64>,
    pub severity: SeverityLevel,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Verification
// ============================================================================

/// Fetches once from `fetcher` and compares the result against `expected`.
///
/// Bypasses any cache so the report always reflects a live request.
pub async fn verify_endpoint(fetcher: &dyn Fetch, expected: &[Pollutant]) -> EndpointVerification {
    let mut result = EndpointVerification {
        timestamp: Utc::now().to_rfc3339(),
        endpoint: fetcher.endpoint().to_string(),
        status: VerificationStatus::Failed,
        pollutants_expected: expected.to_vec(),
        pollutants_available: Vec::new(),
        pollutants_missing: expected.to_vec(),
        air_quality_index: None,
        severity: SeverityLevel::Unknown,
        error_kind: None,
        error_message: None,
    };

    match fetcher.fetch().await {
        Ok(readings) => {
            result.pollutants_available = readings.pollutants().collect();
            result.pollutants_missing = expected
                .iter()
                .copied()
                .filter(|p| readings.get(*p).is_none())
                .collect();
            result.air_quality_index = readings.air_quality();
            result.severity = classify(&readings);
            result.status = if result.pollutants_missing.is_empty() {
                VerificationStatus::Success
            } else {
                VerificationStatus::PartialSuccess
            };
        }
        Err(err) => {
            logging::log_fetch_failure(&result.endpoint, &err);
            result.error_kind = Some(logging::failure_kind(&err).to_string());
            result.error_message = Some(err.to_string());
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FetchError, PollutantReading};
    use async_trait::async_trait;

    struct OneShot(Result<PollutantReading, FetchError>);

    #[async_trait]
    impl Fetch for OneShot {
        async fn fetch(&self) -> Result<PollutantReading, FetchError> {
            self.0.clone()
        }

        fn endpoint(&self) -> &str {
            "http://sensor.local/air"
        }
    }

    #[tokio::test]
    async fn test_all_expected_pollutants_present_is_success() {
        let fetcher = OneShot(Ok(PollutantReading::new()
            .with(Pollutant::Pm25, 10.0)
            .with(Pollutant::No2, 120.0)));
        let report = verify_endpoint(&fetcher, &[Pollutant::Pm25, Pollutant::No2]).await;

        assert_eq!(report.status, VerificationStatus::Success);
        assert_eq!(report.severity, SeverityLevel::Inferior);
        assert!(report.pollutants_missing.is_empty());
        assert_eq!(report.endpoint, "http://sensor.local/air");
        assert!(report.error_message.is_none());
    }

    #[tokio::test]
    async fn test_missing_expected_pollutant_is_partial_success() {
        let fetcher = OneShot(Ok(PollutantReading::new().with(Pollutant::Pm25, 10.0)));
        let report = verify_endpoint(&fetcher, &[Pollutant::Pm25, Pollutant::O3]).await;

        assert_eq!(report.status, VerificationStatus::PartialSuccess);
        assert_eq!(report.pollutants_available, vec![Pollutant::Pm25]);
        assert_eq!(report.pollutants_missing, vec![Pollutant::O3]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported_with_kind() {
        let fetcher = OneShot(Err(FetchError::NoUsableData));
        let report = verify_endpoint(&fetcher, &[Pollutant::Pm10]).await;

        assert_eq!(report.status, VerificationStatus::Failed);
        assert_eq!(report.severity, SeverityLevel::Unknown);
        assert_eq!(report.pollutants_missing, vec![Pollutant::Pm10]);
        assert_eq!(report.error_kind.as_deref(), Some("no_usable_data"));
    }

    #[tokio::test]
    async fn test_report_serializes_to_json() {
        let fetcher = OneShot(Ok(PollutantReading::new()
            .with(Pollutant::Pm25, 80.0)
            .with_air_quality(2.0)));
        let report = verify_endpoint(&fetcher, &[]).await;
        let json = serde_json::to_value(&report).expect("report should serialize");

        assert_eq!(json["status"], "Success");
        assert_eq!(json["severity"], "FAIR");
        assert_eq!(json["air_quality_index"], 2.0);
    }
}
