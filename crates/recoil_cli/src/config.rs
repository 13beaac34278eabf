//! Recoil configuration file handling

use anyhow::{Context, Result};
use recoil_animation::SpringConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE: &str = "recoil.toml";

/// Top-level configuration (recoil.toml)
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RecoilConfig {
    #[serde(default)]
    pub spring: SpringConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Frame loop settings for headless runs
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct SimulationConfig {
    /// Interval between frames in milliseconds
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    /// Give up if the spring has not rested after this many frames
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

fn default_frame_ms() -> f64 {
    16.0
}

fn default_max_frames() -> usize {
    10_000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_ms: default_frame_ms(),
            max_frames: default_max_frames(),
        }
    }
}

impl RecoilConfig {
    /// Load configuration from a file, or from `recoil.toml` inside a directory
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join(CONFIG_FILE)
        } else {
            path.to_path_buf()
        };

        if !config_path.exists() {
            anyhow::bail!(
                "No config found at {}. Run `recoil init` to create one.",
                config_path.display()
            );
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RecoilConfig = toml::from_str(content)?;
        config.spring.validate()?;
        if !(config.simulation.frame_ms.is_finite() && config.simulation.frame_ms > 0.0) {
            anyhow::bail!(
                "simulation.frame_ms must be positive, got {}",
                config.simulation.frame_ms
            );
        }
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Write a default configuration, refusing to overwrite an existing file
    pub fn write_default(path: &Path) -> Result<()> {
        let config_path = if path.is_dir() {
            path.join(CONFIG_FILE)
        } else {
            path.to_path_buf()
        };

        if config_path.exists() {
            anyhow::bail!("{} already exists", config_path.display());
        }

        fs::write(&config_path, Self::default().to_toml()?)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        tracing::info!("Wrote {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = RecoilConfig::from_toml("").unwrap();
        assert_eq!(config, RecoilConfig::default());
        assert_eq!(config.simulation.frame_ms, 16.0);
        assert_eq!(config.simulation.max_frames, 10_000);
    }

    #[test]
    fn test_partial_tables() {
        let config = RecoilConfig::from_toml(
            r#"
[spring]
damping = 26.0

[simulation]
frame_ms = 8.0
"#,
        )
        .unwrap();
        assert_eq!(config.spring.damping, 26.0);
        assert_eq!(config.spring.stiffness, 200.0);
        assert_eq!(config.simulation.frame_ms, 8.0);
        assert_eq!(config.simulation.max_frames, 10_000);
    }

    #[test]
    fn test_invalid_spring_rejected() {
        let err = RecoilConfig::from_toml("[spring]\nmass = 0.0").unwrap_err();
        assert!(err.to_string().contains("mass"));
    }

    #[test]
    fn test_invalid_frame_interval_rejected() {
        assert!(RecoilConfig::from_toml("[simulation]\nframe_ms = 0.0").is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_default() {
        let text = RecoilConfig::default().to_toml().unwrap();
        assert_eq!(RecoilConfig::from_toml(&text).unwrap(), RecoilConfig::default());
    }
}
