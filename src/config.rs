// src/config.rs

use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

impl Config {
    /// Load the YAML config. A missing file yields the defaults; a file that
    /// exists but cannot be parsed is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            Self::from_yaml(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        } else {
            warn!("Config {} not found, using defaults", path.display());
            Config::default()
        };

        if let Ok(url) = std::env::var("CARE_MONITOR_WEBHOOK_URL") {
            if !url.trim().is_empty() {
                info!("📡 Webhook URL taken from environment");
                config.dispatch.webhook_url = Some(url);
            }
        }

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document parses as null, which should mean "all defaults"
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
cooldowns:
  food_consumed_secs: 600
sampling:
  process_every_n_frames: 3
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.cooldowns.food_consumed_secs, 600.0);
        assert_eq!(config.cooldowns.pill_consumed_secs, 5.0);
        assert_eq!(config.sampling.process_every_n_frames, 3);
        assert_eq!(config.sampling.confidence_threshold, 0.3);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = Config::from_yaml("  \n").unwrap();
        assert_eq!(config.pose.missing_grace_secs, 1.0);
        assert_eq!(config.sampling.text_cache_clear_interval, 100);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config = Config::load("does/not/exist.yaml").unwrap();
        assert_eq!(config.classifier.min_area, 800.0);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(Config::from_yaml("pose: [1, 2").is_err());
    }
}
