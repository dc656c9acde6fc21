use std::path::Path;
use std::time::Duration;

use serde_derive::Deserialize;

use crate::error::{PresenceError, Result};
use crate::presence::DEFAULT_AWAKE_TIME;

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AppConfig {
    pub queue_mode: Option<QueueModeConfig>,
    pub devices: Option<Vec<DeviceConfig>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct QueueModeConfig {
    pub awake_time_ms: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeviceConfig {
    pub name: String,
    /// Overrides `queue_mode.awake_time_ms` for this device.
    pub awake_time_ms: Option<i64>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::de::from_str(contents)?)
    }

    pub fn default_awake_time(&self) -> Result<Duration> {
        match self.queue_mode.as_ref().and_then(|q| q.awake_time_ms) {
            Some(millis) => awake_time_from_millis("queue_mode.awake_time_ms", millis),
            None => Ok(DEFAULT_AWAKE_TIME),
        }
    }

    pub fn devices(&self) -> &[DeviceConfig] {
        self.devices.as_deref().unwrap_or_default()
    }
}

impl DeviceConfig {
    pub fn awake_time(&self) -> Result<Option<Duration>> {
        self.awake_time_ms
            .map(|millis| awake_time_from_millis(&format!("{}.awake_time_ms", self.name), millis))
            .transpose()
    }
}

/// Converts a configured awake time, rejecting zero and negative values.
pub fn awake_time_from_millis(field: &str, millis: i64) -> Result<Duration> {
    u64::try_from(millis)
        .ok()
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| {
            PresenceError::InvalidConfiguration(format!(
                "{field} must be a positive number of milliseconds, got {millis}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config_str = r#"
            [queue_mode]
            awake_time_ms = 60000

            [[devices]]
            name = "sensor-1"

            [[devices]]
            name = "sensor-2"
            awake_time_ms = 30000
        "#;
        let config = AppConfig::from_toml(config_str).unwrap();
        assert_eq!(config.default_awake_time().unwrap(), Duration::from_secs(60));
        assert_eq!(config.devices().len(), 2);
        assert_eq!(config.devices()[0].awake_time().unwrap(), None);
        assert_eq!(
            config.devices()[1].awake_time().unwrap(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.default_awake_time().unwrap(), DEFAULT_AWAKE_TIME);
        assert!(config.devices().is_empty());
    }

    #[test]
    fn test_rejects_non_positive_awake_time() {
        let config = AppConfig::from_toml("[queue_mode]\nawake_time_ms = 0\n").unwrap();
        assert!(matches!(
            config.default_awake_time(),
            Err(PresenceError::InvalidConfiguration(_))
        ));

        let config = AppConfig::from_toml(
            r#"
            [[devices]]
            name = "sensor-1"
            awake_time_ms = -5
        "#,
        )
        .unwrap();
        let err = config.devices()[0].awake_time().unwrap_err();
        assert!(err.to_string().contains("sensor-1.awake_time_ms"));
    }

    #[test]
    fn test_awake_time_from_millis() {
        assert_eq!(
            awake_time_from_millis("x", 93000).unwrap(),
            Duration::from_millis(93000)
        );
        assert!(awake_time_from_millis("x", 0).is_err());
        assert!(awake_time_from_millis("x", -5).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AppConfig::from_toml("[queue_mode\n"),
            Err(PresenceError::Config(_))
        ));
    }
}
