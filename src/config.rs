/// Accessory configuration.
///
/// Loaded once from a TOML file at startup and immutable afterwards. Every
/// field except `url` has a default, so the smallest useful file is a single
/// line:
///
/// ```toml
/// url = "http://192.168.1.40/air.json"
/// ```
///
/// Full example:
///
/// ```toml
/// name = "Living Room Air"
/// air_quality_index_name = "Air Quality"
/// url = "https://sensors.example.net/api/v1/current"
/// http_method = "GET"
/// timeout_ms = 5000
/// polling_interval = 300        # seconds, 0 disables the background refresh
/// pollutants = ["pm25", "pm10", "no2"]
///
/// [credentials]
/// username = "reader"
/// password = "hunter2"
/// ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Pollutant;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_NAME: &str = "Air Quality";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 300;

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_polling_interval() -> u64 {
    DEFAULT_POLLING_INTERVAL_SECS
}

fn default_pollutants() -> Vec<Pollutant> {
    Pollutant::ALL.to_vec()
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    #[serde(rename = "GET", alias = "get")]
    Get,
    #[serde(rename = "POST", alias = "post")]
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Basic-auth credentials sent with every request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Accessory name shown by the host.
    #[serde(default = "default_name")]
    pub name: String,
    /// Name of the aggregate index characteristic.
    #[serde(default = "default_name")]
    pub air_quality_index_name: String,
    pub url: String,
    #[serde(default)]
    pub http_method: HttpMethod,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Seconds between background refreshes; 0 disables them.
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Pollutants exposed to the host. The aggregate index is always exposed.
    #[serde(default = "default_pollutants")]
    pub pollutants: Vec<Pollutant>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl PollConfig {
    /// Config with defaults for everything but the endpoint.
    pub fn for_url(url: impl Into<String>) -> Self {
        PollConfig {
            name: default_name(),
            air_quality_index_name: default_name(),
            url: url.into(),
            http_method: HttpMethod::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            polling_interval: DEFAULT_POLLING_INTERVAL_SECS,
            credentials: None,
            pollutants: default_pollutants(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PollConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("url must not be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "url must use http or https, got '{}'",
                self.url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be greater than 0".to_string()));
        }
        if self.pollutants.is_empty() {
            return Err(ConfigError::Invalid(
                "pollutants must list at least one pollutant".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for p in &self.pollutants {
            if !seen.insert(p) {
                return Err(ConfigError::Invalid(format!("pollutant '{}' listed twice", p)));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval)
    }

    pub fn exposes(&self, pollutant: Pollutant) -> bool {
        self.pollutants.contains(&pollutant)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = PollConfig::from_toml_str(r#"url = "http://10.0.0.5/air""#)
            .expect("minimal config should load");
        assert_eq!(config.name, "Air Quality");
        assert_eq!(config.air_quality_index_name, "Air Quality");
        assert_eq!(config.http_method, HttpMethod::Get);
        assert_eq!(config.timeout(), Duration::from_millis(5_000));
        assert_eq!(config.polling_interval(), Duration::from_secs(300));
        assert!(config.credentials.is_none());
        assert_eq!(config.pollutants, Pollutant::ALL.to_vec());
        assert_eq!(config, PollConfig::for_url("http://10.0.0.5/air"));
    }

    #[test]
    fn test_full_config_parses() {
        let config = PollConfig::from_toml_str(
            r#"
            name = "Bedroom"
            air_quality_index_name = "AQI"
            url = "https://sensors.example.net/current"
            http_method = "POST"
            timeout_ms = 2500
            polling_interval = 0
            pollutants = ["pm25", "no2"]

            [credentials]
            username = "reader"
            password = "secret"
            "#,
        )
        .expect("full config should load");
        assert_eq!(config.name, "Bedroom");
        assert_eq!(config.http_method, HttpMethod::Post);
        assert_eq!(config.polling_interval(), Duration::ZERO);
        assert_eq!(config.pollutants, vec![Pollutant::Pm25, Pollutant::No2]);
        assert!(config.exposes(Pollutant::No2));
        assert!(!config.exposes(Pollutant::O3));
        let creds = config.credentials.expect("credentials table present");
        assert_eq!(creds.username, "reader");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn test_lowercase_method_is_accepted() {
        let config = PollConfig::from_toml_str(
            "url = \"http://x/air\"\nhttp_method = \"post\"",
        )
        .expect("lowercase alias should load");
        assert_eq!(config.http_method, HttpMethod::Post);
    }

    #[test]
    fn test_missing_url_is_parse_error() {
        let err = PollConfig::from_toml_str("name = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_unknown_pollutant_is_parse_error() {
        let err = PollConfig::from_toml_str("url = \"http://x\"\npollutants = [\"co2\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_non_http_url_is_invalid() {
        let err = PollConfig::from_toml_str(r#"url = "ftp://x/air""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {:?}", err);
    }

    #[test]
    fn test_zero_timeout_and_duplicate_pollutants_are_invalid() {
        let mut config = PollConfig::for_url("http://x/air");
        config.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = PollConfig::for_url("http://x/air");
        config.pollutants = vec![Pollutant::Pm25, Pollutant::Pm25];
        assert!(config.validate().is_err());

        config.pollutants.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PollConfig::load("/nonexistent/airq.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/airq.toml"));
    }

    #[test]
    fn test_debug_output_hides_password() {
        let creds = Credentials {
            username: "reader".into(),
            password: "secret".into(),
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("reader"));
        assert!(!shown.contains("secret"));
    }
}
