// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tagging configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the standard 11-point format at 30 fps.

use crate::error::ConfigError;
use crate::rules::score_progression::SetRule;
use crate::rules::serve_rotation::ServiceRule;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Frames per second of the source video; one nudge or step is one frame.
    pub frame_rate: f64,
    /// Playback rate requested while skipping dead time between rallies.
    pub fast_forward_rate: f64,
    /// Seconds within which a reported time counts as having reached a seek target.
    pub seek_tolerance: f64,
    /// Replay each rally after confirming it in detail capture.
    pub review_rallies: bool,
    /// Depth of the correction undo history.
    pub history_depth: usize,
    pub service: ServiceRule,
    pub scoring: SetRule,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            fast_forward_rate: 4.0,
            seek_tolerance: 0.25,
            review_rallies: false,
            history_depth: 50,
            service: ServiceRule::default(),
            scoring: SetRule::default(),
        }
    }
}

impl TaggerConfig {
    /// Load a config from a YAML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: TaggerConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&text)?,
            _ => serde_yaml::from_str(&text)?,
        };
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !(self.fast_forward_rate.is_finite() && self.fast_forward_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fast_forward_rate must be positive, got {}",
                self.fast_forward_rate
            )));
        }
        if self.seek_tolerance < 0.0 {
            return Err(ConfigError::Invalid("seek_tolerance cannot be negative".to_string()));
        }
        if self.service.points_per_turn == 0 {
            return Err(ConfigError::Invalid("service.points_per_turn must be at least 1".to_string()));
        }
        if self.scoring.target == 0 {
            return Err(ConfigError::Invalid("scoring.target must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "frame_rate: 50\nscoring:\n  target: 21\n").unwrap();

        let config = TaggerConfig::load(file.path()).unwrap();
        assert_eq!(config.frame_rate, 50.0);
        assert_eq!(config.scoring.target, 21);
        assert_eq!(config.scoring.win_by, 2);
        assert_eq!(config.service, ServiceRule::default());
        assert!(!config.review_rallies);
    }

    #[test]
    fn test_json_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"review_rallies": true, "history_depth": 5}}"#).unwrap();

        let config = TaggerConfig::load(file.path()).unwrap();
        assert!(config.review_rallies);
        assert_eq!(config.history_depth, 5);
    }

    #[test]
    fn test_rejects_zero_frame_rate() {
        let config = TaggerConfig {
            frame_rate: 0.0,
            ..TaggerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
