use crate::error::{GeoflowError, Result};
use crate::models::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Resolved settings consumed by an analysis session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub user_tier: Tier,
    pub data_layer_opacity: f64,
    pub result_layer_opacity: f64,
    pub feature_zoom: u8,
    pub upload_zoom: u8,
    pub progress_interval: Duration,
    pub job_timeout: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        LayeredConfig::with_defaults().settings()
    }
}

/// Layered configuration for GeoFlow
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub user_tier: ConfigValue<Tier>,
    pub data_layer_opacity: ConfigValue<f64>,
    pub result_layer_opacity: ConfigValue<f64>,
    pub feature_zoom: ConfigValue<u8>,
    pub upload_zoom: ConfigValue<u8>,
    pub progress_interval_ms: ConfigValue<u64>,
    pub job_timeout_secs: ConfigValue<Option<u64>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            user_tier: ConfigValue::new(Tier::Free, ConfigSource::Default),
            data_layer_opacity: ConfigValue::new(0.8, ConfigSource::Default),
            result_layer_opacity: ConfigValue::new(0.7, ConfigSource::Default),
            feature_zoom: ConfigValue::new(12, ConfigSource::Default),
            upload_zoom: ConfigValue::new(10, ConfigSource::Default),
            progress_interval_ms: ConfigValue::new(800, ConfigSource::Default),
            job_timeout_secs: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeoflowError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeoflowError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(tier) = file_config.user_tier {
            self.user_tier.update(tier, ConfigSource::File);
        }

        if let Some(opacity) = file_config.data_layer_opacity {
            self.data_layer_opacity.update(opacity, ConfigSource::File);
        }

        if let Some(opacity) = file_config.result_layer_opacity {
            self.result_layer_opacity.update(opacity, ConfigSource::File);
        }

        if let Some(zoom) = file_config.feature_zoom {
            self.feature_zoom.update(zoom, ConfigSource::File);
        }

        if let Some(zoom) = file_config.upload_zoom {
            self.upload_zoom.update(zoom, ConfigSource::File);
        }

        if let Some(interval) = file_config.progress_interval_ms {
            self.progress_interval_ms.update(interval, ConfigSource::File);
        }

        if let Some(timeout) = file_config.job_timeout_secs {
            self.job_timeout_secs.update(non_zero(timeout), ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEOFLOW_TIER
        if let Ok(tier_str) = env::var("GEOFLOW_TIER") {
            match tier_str.parse::<Tier>() {
                Ok(tier) => self.user_tier.update(tier, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOFLOW_TIER value '{}': expected free, premium, pro, or enterprise",
                    tier_str
                ),
            }
        }

        // GEOFLOW_DATA_OPACITY
        if let Some(opacity) = parse_env::<f64>("GEOFLOW_DATA_OPACITY", "a number in [0, 1]") {
            self.data_layer_opacity.update(opacity, ConfigSource::Environment);
        }

        // GEOFLOW_RESULT_OPACITY
        if let Some(opacity) = parse_env::<f64>("GEOFLOW_RESULT_OPACITY", "a number in [0, 1]") {
            self.result_layer_opacity.update(opacity, ConfigSource::Environment);
        }

        // GEOFLOW_FEATURE_ZOOM
        if let Some(zoom) = parse_env::<u8>("GEOFLOW_FEATURE_ZOOM", "an integer zoom level") {
            self.feature_zoom.update(zoom, ConfigSource::Environment);
        }

        // GEOFLOW_UPLOAD_ZOOM
        if let Some(zoom) = parse_env::<u8>("GEOFLOW_UPLOAD_ZOOM", "an integer zoom level") {
            self.upload_zoom.update(zoom, ConfigSource::Environment);
        }

        // GEOFLOW_PROGRESS_INTERVAL_MS
        if let Some(interval) =
            parse_env::<u64>("GEOFLOW_PROGRESS_INTERVAL_MS", "an integer number of milliseconds")
        {
            self.progress_interval_ms.update(interval, ConfigSource::Environment);
        }

        // GEOFLOW_JOB_TIMEOUT_SECS (0 disables the watchdog)
        if let Some(timeout) =
            parse_env::<u64>("GEOFLOW_JOB_TIMEOUT_SECS", "an integer number of seconds")
        {
            self.job_timeout_secs.update(non_zero(timeout), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(tier) = overrides.user_tier {
            self.user_tier.update(tier, ConfigSource::Cli);
        }

        if let Some(interval) = overrides.progress_interval_ms {
            self.progress_interval_ms.update(interval, ConfigSource::Cli);
        }

        if let Some(timeout) = overrides.job_timeout_secs {
            self.job_timeout_secs.update(non_zero(timeout), ConfigSource::Cli);
        }
    }

    /// Check value ranges that the type system does not enforce
    pub fn validate(&self) -> Result<()> {
        for (key, opacity) in [
            ("data_layer_opacity", self.data_layer_opacity.value),
            ("result_layer_opacity", self.result_layer_opacity.value),
        ] {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(GeoflowError::ConfigInvalid {
                    key: key.to_string(),
                    reason: format!("{} is outside [0, 1]", opacity),
                });
            }
        }

        for (key, zoom) in [
            ("feature_zoom", self.feature_zoom.value),
            ("upload_zoom", self.upload_zoom.value),
        ] {
            if zoom > MAX_ZOOM {
                return Err(GeoflowError::ConfigInvalid {
                    key: key.to_string(),
                    reason: format!("{} exceeds the maximum zoom level {}", zoom, MAX_ZOOM),
                });
            }
        }

        Ok(())
    }

    /// Resolve plain settings for a session
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            user_tier: self.user_tier.value,
            data_layer_opacity: self.data_layer_opacity.value,
            result_layer_opacity: self.result_layer_opacity.value,
            feature_zoom: self.feature_zoom.value,
            upload_zoom: self.upload_zoom.value,
            progress_interval: Duration::from_millis(self.progress_interval_ms.value),
            job_timeout: self.job_timeout_secs.value.map(Duration::from_secs),
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "user_tier".to_string(),
            (self.user_tier.value.to_string(), self.user_tier.source),
        );

        map.insert(
            "data_layer_opacity".to_string(),
            (self.data_layer_opacity.value.to_string(), self.data_layer_opacity.source),
        );

        map.insert(
            "result_layer_opacity".to_string(),
            (self.result_layer_opacity.value.to_string(), self.result_layer_opacity.source),
        );

        map.insert(
            "feature_zoom".to_string(),
            (self.feature_zoom.value.to_string(), self.feature_zoom.source),
        );

        map.insert(
            "upload_zoom".to_string(),
            (self.upload_zoom.value.to_string(), self.upload_zoom.source),
        );

        map.insert(
            "progress_interval_ms".to_string(),
            (self.progress_interval_ms.value.to_string(), self.progress_interval_ms.source),
        );

        map.insert(
            "job_timeout_secs".to_string(),
            (
                self.job_timeout_secs
                    .value
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "disabled".to_string()),
                self.job_timeout_secs.source,
            ),
        );

        map
    }
}

const MAX_ZOOM: u8 = 22;

fn non_zero(secs: u64) -> Option<u64> {
    (secs > 0).then_some(secs)
}

fn parse_env<T: std::str::FromStr>(key: &str, expected: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected {}", key, raw, expected);
            None
        }
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    user_tier: Option<Tier>,
    data_layer_opacity: Option<f64>,
    result_layer_opacity: Option<f64>,
    feature_zoom: Option<u8>,
    upload_zoom: Option<u8>,
    progress_interval_ms: Option<u64>,
    job_timeout_secs: Option<u64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub user_tier: Option<Tier>,
    pub progress_interval_ms: Option<u64>,
    pub job_timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.user_tier.value, Tier::Free);
        assert_eq!(config.user_tier.source, ConfigSource::Default);
        assert_eq!(config.data_layer_opacity.value, 0.8);
        assert_eq!(config.result_layer_opacity.value, 0.7);
        assert_eq!(config.feature_zoom.value, 12);
        assert!(config.job_timeout_secs.value.is_none());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        // CLI should override environment
        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
user_tier = "pro"
result_layer_opacity = 0.5
progress_interval_ms = 0
job_timeout_secs = 30
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.user_tier.value, Tier::Pro);
        assert_eq!(config.user_tier.source, ConfigSource::File);
        assert_eq!(config.result_layer_opacity.value, 0.5);
        assert_eq!(config.progress_interval_ms.value, 0);
        assert_eq!(config.job_timeout_secs.value, Some(30));
        assert_eq!(config.data_layer_opacity.source, ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        config.update_from_cli(CliConfigOverrides {
            user_tier: Some(Tier::Enterprise),
            progress_interval_ms: None,
            job_timeout_secs: Some(0),
        });

        assert_eq!(config.user_tier.value, Tier::Enterprise);
        assert_eq!(config.user_tier.source, ConfigSource::Cli);
        assert_eq!(config.job_timeout_secs.value, None);
        assert_eq!(config.job_timeout_secs.source, ConfigSource::Cli);
        assert_eq!(config.progress_interval_ms.source, ConfigSource::Default);
    }

    #[test]
    fn test_validate_rejects_bad_opacity() {
        let mut config = LayeredConfig::with_defaults();
        assert!(config.validate().is_ok());

        config.data_layer_opacity.update(1.5, ConfigSource::Cli);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            GeoflowError::ConfigInvalid { ref key, .. } if key == "data_layer_opacity"
        ));
    }

    #[test]
    fn test_settings() {
        let settings = LayeredConfig::with_defaults().settings();
        assert_eq!(settings.progress_interval, Duration::from_millis(800));
        assert_eq!(settings.job_timeout, None);
        assert_eq!(settings, SessionSettings::default());
    }

    #[test]
    fn test_inspection_map() {
        let map = LayeredConfig::with_defaults().to_inspection_map();

        let (tier, source) = &map["user_tier"];
        assert_eq!(tier, "free");
        assert_eq!(*source, ConfigSource::Default);
        assert_eq!(map["job_timeout_secs"].0, "disabled");
    }
}
