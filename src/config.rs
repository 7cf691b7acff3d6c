// src/config.rs
//! Configuration management with file-based storage

use crate::error::{MissionError, Result};
use crate::waypoint::MavFrame;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub home_latitude: f64,
    pub home_longitude: f64,
    /// Default altitude relative to home, metres
    pub default_altitude: f64,
    /// Default acceptance radius, metres
    pub acceptance_radius: f64,
    pub default_frame: MavFrame,
    pub mission_directory: Option<PathBuf>,
    pub default_mission_file: String,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            home_latitude: 47.3977,
            home_longitude: 8.5456,
            default_altitude: 20.0,
            acceptance_radius: 3.0,
            default_frame: MavFrame::GlobalRelativeAlt,
            mission_directory: None,
            default_mission_file: "mission.json".to_string(),
        }
    }
}

impl MissionConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    /// Load from an explicit file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| MissionError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| MissionError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MissionError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| MissionError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| MissionError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| MissionError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("mission-list").join("config.json"))
    }

    /// Directory offered when saving or loading missions
    pub fn mission_directory(&self) -> PathBuf {
        self.mission_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn default_mission_path(&self) -> PathBuf {
        self.mission_directory().join(&self.default_mission_file)
    }

    /// Update home position
    pub fn update_home(&mut self, latitude: f64, longitude: f64) {
        self.home_latitude = latitude;
        self.home_longitude = longitude;
    }

    /// Update waypoint defaults
    pub fn update_defaults(&mut self, altitude: f64, acceptance_radius: f64, frame: MavFrame) {
        self.default_altitude = altitude;
        self.acceptance_radius = acceptance_radius;
        self.default_frame = frame;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MissionConfig::default();
        assert_eq!(config.default_frame, MavFrame::GlobalRelativeAlt);
        assert_eq!(config.default_mission_path(), PathBuf::from("./mission.json"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MissionConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, MissionConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = MissionConfig::default();
        config.update_home(-35.36, 149.16);
        config.update_defaults(50.0, 5.0, MavFrame::Global);
        config.save_to(&path).unwrap();

        let loaded = MissionConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "default_altitude": 42.0 }"#).unwrap();

        let config = MissionConfig::load_from(&path).unwrap();
        assert_eq!(config.default_altitude, 42.0);
        assert_eq!(config.acceptance_radius, 3.0);
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(MissionConfig::load_from(&path), Err(MissionError::Config(_))));
    }
}
