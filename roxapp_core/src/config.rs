//! Configuration file support for RoxApp.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/roxapp/config.toml`.

use crate::cue::CueProfile;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub cues: CueConfig,
}

/// Plan storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_plans_dir")]
    pub plans_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            plans_dir: default_plans_dir(),
        }
    }
}

/// Update loop cadence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl ClockConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Where cues are played
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CueBackend {
    Silent,
    #[default]
    Bell,
    /// Sine tones on the audio device (needs the `audio` feature)
    Tone,
}

/// Audible cue configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CueConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CueBackend,

    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default)]
    pub profile: CueProfile,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CueBackend::default(),
            volume: default_volume(),
            profile: CueProfile::default(),
        }
    }
}

// Default value functions
fn default_plans_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("roxapp").join("plans")
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_volume() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.check()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("roxapp").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.clock.frame_interval_ms == 0 {
            return Err(Error::Config("clock.frame_interval_ms must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.cues.volume) {
            return Err(Error::Config(format!(
                "cues.volume must be within 0.0..=1.0, got {}",
                self.cues.volume
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::{Cue, Tone};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.clock.frame_interval_ms, 16);
        assert!(config.cues.enabled);
        assert_eq!(config.cues.backend, CueBackend::Bell);
        assert!(config.data.plans_dir.ends_with("roxapp/plans"));
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.cues.backend = CueBackend::Silent;
        config.clock.frame_interval_ms = 50;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.cues.backend, CueBackend::Silent);
        assert_eq!(loaded.clock.frame_interval_ms, 50);
        assert_eq!(loaded.cues.profile, config.cues.profile);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[cues]
backend = "tone"

[cues.profile.countdown]
frequency_hz = 1000
duration_ms = 80
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cues.backend, CueBackend::Tone);
        assert_eq!(config.cues.profile.tone(Cue::Countdown(3)), Tone::new(1000, 80));
        assert_eq!(config.cues.volume, 0.3); // default
        assert_eq!(config.clock.frame_interval_ms, 16); // default
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[clock]\nframe_interval_ms = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "[cues]\nvolume = 4.0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
