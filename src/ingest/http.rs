/// HTTP endpoint client.
///
/// Performs one remote read of the configured air quality endpoint and parses
/// the JSON body into a `PollutantReading`. The fetcher knows nothing about
/// caching or snapshots; the poll coordinator decides when to call it.
///
/// Expected response shape: a JSON object with pollutant keys (`pm10`,
/// `pm25`, `o3`, `no2`, `so2`, `voc`) as top-level fields, optionally with
/// an `air_quality` aggregate index. Values may be numbers or numeric
/// strings; anything else is dropped.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

use crate::config::{Credentials, HttpMethod, PollConfig};
use crate::model::{AIR_QUALITY_KEY, FetchError, Pollutant, PollutantReading};

// ============================================================================
// Fetch seam
// ============================================================================

/// One remote read of pollutant data.
///
/// Implemented by `HttpFetcher` in production and by scripted fakes in tests.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self) -> Result<PollutantReading, FetchError>;

    /// Identifier used in log lines.
    fn endpoint(&self) -> &str {
        "unnamed"
    }
}

// ============================================================================
// reqwest-backed fetcher
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    url: String,
    method: HttpMethod,
    credentials: Option<Credentials>,
}

impl HttpFetcher {
    /// Builds a fetcher for `config`. The configured timeout is applied to
    /// the whole request, connect through body.
    pub fn new(config: &PollConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpFetcher {
            client,
            url: config.url.clone(),
            method: config.http_method,
            credentials: config.credentials.clone(),
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self) -> Result<PollutantReading, FetchError> {
        let mut request = match self.method {
            HttpMethod::Get => self.client.get(&self.url),
            HttpMethod::Post => self.client.post(&self.url),
        }
        .header(ACCEPT, "application/json");

        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Transport(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_readings(&body)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Transport("request timed out".to_string())
        } else if err.is_connect() {
            FetchError::Transport(format!("connection failed: {}", err))
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

// ============================================================================
// Body parsing
// ============================================================================

/// Parses an endpoint body into readings.
///
/// # Errors
/// - `Parse` if the body is not JSON or not a JSON object.
/// - `NoUsableData` if no pollutant value survived numeric coercion, even
///   when an aggregate index is present.
pub fn parse_readings(body: &str) -> Result<PollutantReading, FetchError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let fields = json.as_object().ok_or_else(|| {
        FetchError::Parse(format!("expected a JSON object, got {}", json_kind(&json)))
    })?;

    let mut readings = PollutantReading::new();

    for pollutant in Pollutant::ALL {
        let Some(raw) = fields.get(pollutant.key()) else {
            continue;
        };
        let stored = coerce_number(raw)
            .map(|value| readings.insert(pollutant, value))
            .unwrap_or(false);
        if !stored {
            debug!(pollutant = %pollutant, raw = %raw, "dropping non-numeric pollutant value");
        }
    }

    if let Some(raw) = fields.get(AIR_QUALITY_KEY) {
        let stored = coerce_number(raw)
            .map(|index| readings.set_air_quality(index))
            .unwrap_or(false);
        if !stored {
            debug!(raw = %raw, "dropping non-numeric air_quality index");
        }
    }

    // The aggregate only overrides classification; it never stands in for
    // pollutant data.
    if !readings.has_pollutants() {
        return Err(FetchError::NoUsableData);
    }

    Ok(readings)
}

/// JSON numbers pass through; strings are trimmed and parsed. Everything
/// else (null, bool, arrays, objects) is rejected.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures;

    #[test]
    fn test_full_response_parses_every_pollutant() {
        let r = parse_readings(fixtures::FULL_RESPONSE).expect("full response should parse");
        assert_eq!(r.get(Pollutant::Pm10), Some(24.3));
        assert_eq!(r.get(Pollutant::Pm25), Some(16.8), "numeric strings are coerced");
        assert_eq!(r.get(Pollutant::O3), Some(61.0));
        assert_eq!(r.get(Pollutant::No2), Some(18.25), "surrounding whitespace is trimmed");
        assert_eq!(r.get(Pollutant::So2), Some(3.1));
        assert_eq!(r.get(Pollutant::Voc), Some(212.0));
        assert_eq!(r.pollutant_count(), 6, "unrelated fields such as temperature are ignored");
        assert_eq!(r.air_quality(), None);
    }

    #[test]
    fn test_aggregate_field_is_captured() {
        let r = parse_readings(fixtures::AGGREGATE_RESPONSE).expect("should parse");
        assert_eq!(r.air_quality(), Some(1.0));
        assert_eq!(r.get(Pollutant::Pm25), Some(92.0));
    }

    #[test]
    fn test_invalid_values_are_dropped_not_stored() {
        let r = parse_readings(fixtures::PARTIAL_RESPONSE).expect("pm25 survives");
        assert_eq!(r.get(Pollutant::Pm25), Some(12.5));
        assert_eq!(r.get(Pollutant::Pm10), None, "negative concentration dropped");
        assert_eq!(r.get(Pollutant::No2), None, "NaN dropped");
        assert_eq!(r.get(Pollutant::So2), None, "booleans are not numbers");
        assert_eq!(r.pollutant_count(), 1);
    }

    #[test]
    fn test_no_numeric_pollutants_is_no_usable_data() {
        assert_eq!(
            parse_readings(fixtures::UNUSABLE_RESPONSE),
            Err(FetchError::NoUsableData)
        );
        assert_eq!(parse_readings("{}"), Err(FetchError::NoUsableData));
    }

    #[test]
    fn test_aggregate_without_pollutants_is_no_usable_data() {
        assert_eq!(
            parse_readings(fixtures::AGGREGATE_ONLY_RESPONSE),
            Err(FetchError::NoUsableData)
        );
        assert_eq!(
            parse_readings(r#"{"air_quality": 2, "pm25": "n/a"}"#),
            Err(FetchError::NoUsableData)
        );
    }

    #[test]
    fn test_non_object_json_is_parse_error() {
        match parse_readings(fixtures::ARRAY_RESPONSE) {
            Err(FetchError::Parse(msg)) => assert!(msg.contains("an array"), "got: {}", msg),
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_body_is_parse_error() {
        assert!(matches!(
            parse_readings(fixtures::TRUNCATED_RESPONSE),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(parse_readings(""), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_coerce_number_rejects_non_scalars() {
        assert_eq!(coerce_number(&Value::Null), None);
        assert_eq!(coerce_number(&serde_json::json!([1])), None);
        assert_eq!(coerce_number(&serde_json::json!({"v": 1})), None);
        assert_eq!(coerce_number(&serde_json::json!("12abc")), None);
        assert_eq!(coerce_number(&serde_json::json!(" 7 ")), Some(7.0));
    }
}
