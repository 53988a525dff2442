//! Representative endpoint payloads used by the parser tests.

/// Typical sensor gateway response: every pollutant, numbers and numeric strings mixed.
pub const FULL_RESPONSE: &str = r#"{
    "pm10": 24.3,
    "pm25": "16.8",
    "o3": 61,
    "no2": " 18.25 ",
    "so2": 3.1,
    "voc": 212,
    "temperature": 21.4,
    "humidity": 48
}"#;

/// Upstream service that reports its own aggregate index.
pub const AGGREGATE_RESPONSE: &str = r#"{
    "pm25": 92.0,
    "air_quality": 1
}"#;

/// Aggregate index with no pollutant channels behind it.
pub const AGGREGATE_ONLY_RESPONSE: &str = r#"{"air_quality": 2}"#;

/// Gateway mid-boot: keys present but nothing numeric.
pub const UNUSABLE_RESPONSE: &str = r#"{
    "pm10": "n/a",
    "pm25": null,
    "o3": "",
    "status": "warming up"
}"#;

/// A sensor reporting garbage for some channels.
pub const PARTIAL_RESPONSE: &str = r#"{
    "pm10": -5,
    "pm25": "12.5",
    "no2": "NaN",
    "so2": true
}"#;

/// Top-level array instead of an object.
pub const ARRAY_RESPONSE: &str = r#"[{"pm25": 10}]"#;

/// Truncated body.
pub const TRUNCATED_RESPONSE: &str = r#"{"pm25": 10, "pm10""#;
