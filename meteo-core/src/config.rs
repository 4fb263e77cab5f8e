use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::forecast::DEFAULT_PAST_DAYS;

/// Hard upper bound the forecast API accepts for `past_days`.
pub const MAX_PAST_DAYS: u8 = 92;

/// Service base URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocoding: String,
    pub forecast: String,
    pub static_map: String,
    pub interactive_map: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast: "https://api.open-meteo.com/v1/forecast".to_string(),
            static_map: "https://staticmap.openstreetmap.de/staticmap.php".to_string(),
            interactive_map: "https://www.openstreetmap.org".to_string(),
        }
    }
}

/// Map panel geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub zoom: u8,
    /// Used once when the image at `zoom` fails to load.
    pub fallback_zoom: u8,
    pub link_zoom: u8,
    pub width: u32,
    pub height: u32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            zoom: 10,
            fallback_zoom: 9,
            link_zoom: 12,
            width: 640,
            height: 320,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// past_days = 90
///
/// [endpoints]
/// forecast = "https://api.open-meteo.com/v1/forecast"
///
/// [map]
/// zoom = 11
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub past_days: u8,
    pub http_timeout_secs: u64,
    pub endpoints: Endpoints,
    pub map: MapSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            past_days: DEFAULT_PAST_DAYS,
            http_timeout_secs: 15,
            endpoints: Endpoints::default(),
            map: MapSettings::default(),
        }
    }
}

impl Config {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Reject settings the services are known to refuse.
    pub fn validate(&self) -> Result<()> {
        if self.past_days > MAX_PAST_DAYS {
            bail!(
                "past_days = {} exceeds the forecast API limit of {MAX_PAST_DAYS}.\n\
                 Hint: run `meteo configure` and pick a smaller history.",
                self.past_days
            );
        }
        if self.http_timeout_secs == 0 {
            bail!("http_timeout_secs must be greater than zero.");
        }
        if self.map.width == 0 || self.map.height == 0 {
            bail!(
                "Map size {}x{} is empty; width and height must be positive.",
                self.map.width,
                self.map.height
            );
        }
        if self.map.fallback_zoom >= self.map.zoom {
            bail!(
                "map.fallback_zoom ({}) must be lower than map.zoom ({}).",
                self.map.fallback_zoom,
                self.map.zoom
            );
        }
        Ok(())
    }

    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let cfg = Self::load_unvalidated_from(path)?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Load without [`Config::validate`], so a bad file can still be edited.
    pub fn load_unvalidated() -> Result<Self> {
        Self::load_unvalidated_from(&Self::config_file_path()?)
    }

    pub fn load_unvalidated_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "meteo", "meteo")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.past_days, 90);
        assert_eq!(cfg.map.zoom, 10);
        assert_eq!(cfg.map.fallback_zoom, 9);
        assert_eq!(cfg.map.link_zoom, 12);
        assert_eq!((cfg.map.width, cfg.map.height), (640, 320));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            past_days = 30

            [map]
            zoom = 11
            "#,
        )
        .expect("partial config parses");

        assert_eq!(cfg.past_days, 30);
        assert_eq!(cfg.map.zoom, 11);
        assert_eq!(cfg.map.fallback_zoom, 9);
        assert_eq!(cfg.endpoints, Endpoints::default());
    }

    #[test]
    fn past_days_above_api_limit_is_rejected() {
        let cfg = Config {
            past_days: 93,
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds the forecast API limit"));
    }

    #[test]
    fn fallback_zoom_must_be_lower() {
        let mut cfg = Config::default();
        cfg.map.fallback_zoom = cfg.map.zoom;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_map_size_is_rejected() {
        let mut cfg = Config::default();
        cfg.map.height = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("Map size"));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.past_days = 14;
        cfg.endpoints.forecast = "http://localhost:8080/v1/forecast".to_string();

        cfg.save_to(&path).expect("save succeeds");
        let loaded = Config::load_from(&path).expect("load succeeds");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn invalid_file_is_reported_with_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "past_days = 120\n").expect("write");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn invalid_file_can_still_be_loaded_for_editing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "past_days = 120\n").expect("write");

        let cfg = Config::load_unvalidated_from(&path).expect("unvalidated load");
        assert_eq!(cfg.past_days, 120);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let loaded = Config::load_from(&dir.path().join("config.toml")).expect("defaults");
        assert_eq!(loaded, Config::default());
    }
}
