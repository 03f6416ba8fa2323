//! # Playback Configuration
//!
//! Options that shape how a score is turned into milliseconds.
//!
//! Configuration is plain data with defaults, loadable from a kebab-case YAML
//! document the same way score metadata is:
//!
//! ```rust
//! use gen_playback::PlaybackConfig;
//!
//! let config = PlaybackConfig::from_yaml("default-tempo: 90\nplayback-rate: 0.5").unwrap();
//! assert_eq!(config.default_tempo, 90.0);
//! assert_eq!(config.playback_rate, 0.5);
//! ```

use crate::error::PlaybackError;
use serde::Deserialize;

/// Default quarter-note tempo when neither the score nor the config sets one
pub const DEFAULT_TEMPO: f64 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Quarter-note BPM used until the first tempo direction
    pub default_tempo: f64,
    /// Speed multiplier applied to every millisecond value (2.0 = twice as fast)
    pub playback_rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_tempo: DEFAULT_TEMPO,
            playback_rate: 1.0,
        }
    }
}

/// Raw config for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    default_tempo: Option<f64>,
    playback_rate: Option<f64>,
}

impl PlaybackConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(source: &str) -> Result<Self, PlaybackError> {
        let raw: RawConfig = if source.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(source)?
        };

        let defaults = Self::default();
        let config = Self {
            default_tempo: raw.default_tempo.unwrap_or(defaults.default_tempo),
            playback_rate: raw.playback_rate.unwrap_or(defaults.playback_rate),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make millisecond conversion meaningless.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        if !self.default_tempo.is_finite() || self.default_tempo <= 0.0 {
            return Err(PlaybackError::ConfigError(format!(
                "default-tempo must be a positive number, got {}",
                self.default_tempo
            )));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(PlaybackError::ConfigError(format!(
                "playback-rate must be a positive number, got {}",
                self.playback_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.default_tempo, 120.0);
        assert_eq!(config.playback_rate, 1.0);
    }

    #[test]
    fn test_config_empty_yaml_uses_defaults() {
        let config = PlaybackConfig::from_yaml("").unwrap();
        assert_eq!(config, PlaybackConfig::default());
    }

    #[test]
    fn test_config_partial_yaml() {
        let config = PlaybackConfig::from_yaml("default-tempo: 100").unwrap();
        assert_eq!(config.default_tempo, 100.0);
        assert_eq!(config.playback_rate, 1.0);
    }

    #[test]
    fn test_config_rejects_zero_tempo() {
        let result = PlaybackConfig::from_yaml("default-tempo: 0");
        assert!(result.is_err());
        if let Err(PlaybackError::ConfigError(message)) = result {
            assert!(message.contains("default-tempo"));
        } else {
            panic!("Expected ConfigError");
        }
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let result = PlaybackConfig::from_yaml("tempo: 100");
        assert!(matches!(result, Err(PlaybackError::YamlError(_))));
    }
}
