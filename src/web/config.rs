use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::predict::{PredictError, Site};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid station: {0}")]
    Station(#[from] PredictError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub predict: PredictConfig,
    #[serde(default)]
    pub mount: MountConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
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

#[derive(Debug, Clone, Deserialize)]
pub struct PredictConfig {
    /// Element files loaded at startup, in order; later files overwrite
    /// earlier records of the same name.
    #[serde(default)]
    pub tle_files: Vec<PathBuf>,
    #[serde(default = "default_step", deserialize_with = "deserialize_duration")]
    pub step: Duration,
    #[serde(default = "default_window", deserialize_with = "deserialize_duration")]
    pub window: Duration,
    #[serde(default)]
    pub default_min_elevation: f64,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            tle_files: Vec::new(),
            step: default_step(),
            window: default_window(),
            default_min_elevation: 0.0,
        }
    }
}

impl PredictConfig {
    pub fn step_minutes(&self) -> f64 {
        self.step.as_secs_f64() / 60.0
    }
}

fn default_step() -> Duration {
    Duration::from_secs(60)
}

fn default_window() -> Duration {
    Duration::from_secs(24 * 3600)
}

#[derive(Debug, Clone, Deserialize)]
pub struct MountConfig {
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval: Duration,
    /// Connect and enable both axes at startup.
    #[serde(default = "default_auto_connect")]
    pub auto_connect: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            auto_connect: default_auto_connect(),
        }
    }
}

fn default_auto_connect() -> bool {
    true
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let duration = humantime::parse_duration(&s).map_err(serde::de::Error::custom)?;
    if duration.is_zero() {
        return Err(serde::de::Error::custom("duration must be positive"));
    }
    Ok(duration)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

impl StationConfig {
    pub fn site(&self) -> Result<Site, PredictError> {
        Site::from_coordinates(&self.coordinates, self.altitude_m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    View,
    ManageCatalog,
    ControlMount,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.station.site()?;
        Ok(config)
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
station:
  name: Bristol
  coordinates: "51.456671, -2.601768"
  altitude_m: 71
web:
  bind: 127.0.0.1:9000
predict:
  tle_files: [tles/active.txt, tles/amateur.txt]
  step: 30s
  window: 8h
  default_min_elevation: 10
mount:
  poll_interval: 500ms
  auto_connect: false
api_keys:
  - key: secret
    name: operator
    permissions: [view, control_mount]
"#;

    #[test]
    fn test_full_config() {
        let config = Config::from_yaml(FULL).unwrap();
        assert_eq!(config.web.bind, "127.0.0.1:9000");
        assert_eq!(config.predict.tle_files.len(), 2);
        assert_eq!(config.predict.step_minutes(), 0.5);
        assert_eq!(config.predict.window, Duration::from_secs(8 * 3600));
        assert_eq!(config.mount.poll_interval, Duration::from_millis(500));
        assert!(!config.mount.auto_connect);

        let site = config.station.site().unwrap();
        assert_eq!(site.latitude_deg, 51.456671);
        assert_eq!(site.height_m, 71.0);

        let key = config.find_api_key("secret").unwrap();
        assert!(key.permissions.contains(&Permission::ControlMount));
        assert!(!key.permissions.contains(&Permission::ManageCatalog));
        assert!(config.find_api_key("nope").is_none());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("station:\n  coordinates: \"0, 0\"\n").unwrap();
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert_eq!(config.predict.step, Duration::from_secs(60));
        assert_eq!(config.mount.poll_interval, Duration::from_secs(1));
        assert!(config.mount.auto_connect);
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn test_bad_station_rejected() {
        let result = Config::from_yaml("station:\n  coordinates: \"95, 0\"\n");
        assert!(matches!(result, Err(ConfigError::Station(_))));
    }

    #[test]
    fn test_bad_duration_rejected() {
        let yaml = "station:\n  coordinates: \"0, 0\"\npredict:\n  step: fast\n";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Yaml(_))));
    }
}
