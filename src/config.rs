use std::path::PathBuf;
use std::time::Duration as StdDuration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::elements::{
    CachePolicy, CelestrakProvider, DirectoryProvider, ElementError, ElementSource,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_URL,
};
use crate::predict::{
    ObserverLocation, PredictError, SearchParams, DEFAULT_COARSE_STEP, DEFAULT_EXPECTED_MIN_PASS,
    DEFAULT_FINE_TOLERANCE, DEFAULT_MIN_ELEVATION_DEG,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<PredictError> for ConfigError {
    fn from(e: PredictError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

impl From<ElementError> for ConfigError {
    fn from(e: ElementError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub observer: ObserverConfig,
    pub elements: ElementsConfig,
    pub search: SearchConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    /// `"lat, lon"` in degrees.
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            coordinates: "0.0, 0.0".to_string(),
            altitude_m: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ProviderConfig {
    Celestrak {
        #[serde(default = "default_url")]
        url: String,
    },
    Directory {
        tle_folder: PathBuf,
    },
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementsConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    #[serde(default = "default_ttl", deserialize_with = "deserialize_duration")]
    pub ttl: StdDuration,
    #[serde(default = "default_max_stale", deserialize_with = "deserialize_duration")]
    pub max_stale: StdDuration,
    #[serde(default = "default_fetch_timeout", deserialize_with = "deserialize_duration")]
    pub fetch_timeout: StdDuration,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::Celestrak { url: default_url() },
            ttl: default_ttl(),
            max_stale: default_max_stale(),
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

fn default_ttl() -> StdDuration {
    StdDuration::from_secs(3600)
}

fn default_max_stale() -> StdDuration {
    StdDuration::from_secs(24 * 3600)
}

fn default_fetch_timeout() -> StdDuration {
    DEFAULT_FETCH_TIMEOUT
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub min_elevation_deg: f64,
    #[serde(deserialize_with = "deserialize_duration")]
    pub coarse_step: StdDuration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub fine_tolerance: StdDuration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub expected_min_pass: StdDuration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_elevation_deg: DEFAULT_MIN_ELEVATION_DEG,
            coarse_step: to_std(DEFAULT_COARSE_STEP),
            fine_tolerance: to_std(DEFAULT_FINE_TOLERANCE),
            expected_min_pass: to_std(DEFAULT_EXPECTED_MIN_PASS),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn observer(&self) -> Result<ObserverLocation, ConfigError> {
        Ok(ObserverLocation::from_coordinates(
            &self.observer.coordinates,
            Some(self.observer.altitude_m),
        )?)
    }

    pub fn search_params(&self) -> Result<SearchParams, ConfigError> {
        Ok(SearchParams {
            min_elevation_deg: self.search.min_elevation_deg,
            coarse_step: from_std(self.search.coarse_step)?,
            fine_tolerance: from_std(self.search.fine_tolerance)?,
            expected_min_pass: from_std(self.search.expected_min_pass)?,
        })
    }

    pub fn cache_policy(&self) -> Result<CachePolicy, ConfigError> {
        Ok(CachePolicy {
            ttl: from_std(self.elements.ttl)?,
            max_stale: from_std(self.elements.max_stale)?,
            fetch_timeout: self.elements.fetch_timeout,
        })
    }

    pub fn element_source(&self) -> Result<ElementSource, ConfigError> {
        Ok(match &self.elements.provider {
            ProviderConfig::Celestrak { url } => {
                if !url.contains("{norad}") {
                    return Err(ConfigError::Invalid(format!(
                        "provider url has no {{norad}} placeholder: {}",
                        url
                    )));
                }
                ElementSource::Celestrak(CelestrakProvider::new(url.clone())?)
            }
            ProviderConfig::Directory { tle_folder } => {
                ElementSource::Directory(DirectoryProvider::new(tle_folder.clone()))
            }
        })
    }
}

pub fn parse_duration(s: &str) -> Result<StdDuration, humantime::DurationError> {
    humantime::parse_duration(s.trim())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<StdDuration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

fn from_std(d: StdDuration) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::from_std(d).map_err(|e| ConfigError::Invalid(e.to_string()))
}

fn to_std(d: chrono::Duration) -> StdDuration {
    d.to_std().unwrap_or_default()
}
