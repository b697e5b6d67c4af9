//! Configuration file support for corescope.
//!
//! This module handles loading and validating user settings from the configuration file
//! located at `~/.config/corescope/config.toml`. Settings include scene defaults,
//! image cache tuning, page setup for paginated output and the label font.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod enums;
pub mod types;

// Re-export commonly used types at module level
pub use enums::{Orientation, Origin, PaperSize};
pub use types::{CacheConfig, PageConfig, SceneConfig, TextConfig};

use crate::draw::FontDescriptor;
use crate::units::Length;
use anyhow::{Context, Result};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure containing all user settings.
///
/// This is the root configuration type that gets deserialized from the TOML file.
/// All fields have sensible defaults and will use those if not specified in the config file.
///
/// # Example TOML
/// ```toml
/// [scene]
/// scale = 200.0
/// units = "m"
/// origin = "top"
///
/// [cache]
/// memory_budget_mb = 512
///
/// [page]
/// paper = "a4"
/// units_per_page = "2 m"
///
/// [text]
/// font_family = "Sans"
/// font_size = 9.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Scene defaults (scale, units, origin, orientation, borders)
    #[serde(default)]
    pub scene: SceneConfig,

    /// Image cache workers, directory and memory budget
    #[serde(default)]
    pub cache: CacheConfig,

    /// Paper and pagination for document output
    #[serde(default)]
    pub page: PageConfig,

    /// Label font for the built-in tracks
    #[serde(default)]
    pub text: TextConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value (or replaced by the
    /// documented default) and a warning is logged.
    ///
    /// Validated ranges:
    /// - `scene.scale`: 0.001 - 100000.0
    /// - `scene.header_height`, `scene.footer_height`: 0.0 - 500.0
    /// - `cache.idle_timeout_secs`: 1 - 3600
    /// - `page.units_per_page`: a positive length with a unit
    /// - `text.font_size`: 4.0 - 72.0
    pub fn validate_and_clamp(&mut self) {
        // Scale: must be positive and finite
        if !self.scene.scale.is_finite() || self.scene.scale <= 0.0 {
            log::warn!(
                "Invalid scene scale {}, falling back to 100 px per unit",
                self.scene.scale
            );
            self.scene.scale = 100.0;
        } else if !(0.001..=100_000.0).contains(&self.scene.scale) {
            log::warn!(
                "Invalid scene scale {}, clamping to 0.001-100000 range",
                self.scene.scale
            );
            self.scene.scale = self.scene.scale.clamp(0.001, 100_000.0);
        }

        // Header/footer bands: 0.0 - 500.0
        if !(0.0..=500.0).contains(&self.scene.header_height) {
            log::warn!(
                "Invalid header_height {:.1}, clamping to 0.0-500.0 range",
                self.scene.header_height
            );
            self.scene.header_height = clamp_or_zero(self.scene.header_height, 500.0);
        }
        if !(0.0..=500.0).contains(&self.scene.footer_height) {
            log::warn!(
                "Invalid footer_height {:.1}, clamping to 0.0-500.0 range",
                self.scene.footer_height
            );
            self.scene.footer_height = clamp_or_zero(self.scene.footer_height, 500.0);
        }

        // Idle timeout: 1 - 3600 seconds
        if !(1..=3600).contains(&self.cache.idle_timeout_secs) {
            log::warn!(
                "Invalid idle_timeout_secs {}, clamping to 1-3600 range",
                self.cache.idle_timeout_secs
            );
            self.cache.idle_timeout_secs = self.cache.idle_timeout_secs.clamp(1, 3600);
        }

        // Units per page must be a positive length
        match Length::parse(&self.page.units_per_page) {
            Ok(length) if length.value > 0.0 => {}
            _ => {
                log::warn!(
                    "Invalid units_per_page '{}', falling back to '1 m'",
                    self.page.units_per_page
                );
                self.page.units_per_page = "1 m".to_string();
            }
        }

        // Font size: 4.0 - 72.0
        if !(4.0..=72.0).contains(&self.text.font_size) {
            log::warn!(
                "Invalid font_size {:.1}, clamping to 4.0-72.0 range",
                self.text.font_size
            );
            self.text.font_size = if self.text.font_size.is_nan() {
                10.0
            } else {
                self.text.font_size.clamp(4.0, 72.0)
            };
        }

        // Validate font weight is reasonable
        let valid_weight = matches!(
            self.text.font_weight.to_lowercase().as_str(),
            "normal" | "bold" | "light" | "ultralight" | "heavy" | "ultrabold"
        ) || self
            .text
            .font_weight
            .parse::<u32>()
            .is_ok_and(|w| (100..=900).contains(&w));

        if !valid_weight {
            log::warn!(
                "Invalid font_weight '{}', falling back to 'normal'",
                self.text.font_weight
            );
            self.text.font_weight = "normal".to_string();
        }

        // Validate font style
        if !matches!(
            self.text.font_style.to_lowercase().as_str(),
            "normal" | "italic" | "oblique"
        ) {
            log::warn!(
                "Invalid font_style '{}', falling back to 'normal'",
                self.text.font_style
            );
            self.text.font_style = "normal".to_string();
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// The config file is located at `~/.config/corescope/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("corescope");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default location, or returns defaults if not found.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The config directory path cannot be determined
    /// - The file exists but cannot be read
    /// - The file exists but contains invalid TOML syntax
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if it does not exist.
    ///
    /// All loaded values are validated and clamped to acceptable ranges.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        // Validate and clamp values to acceptable ranges
        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Creates a default configuration file with documentation comments.
    ///
    /// Writes the example config from `config.example.toml` to the user's config directory
    /// and returns the path written.
    ///
    /// # Errors
    /// Returns an error if:
    /// - A config file already exists at the target path
    /// - The config directory cannot be created
    /// - The file cannot be written
    pub fn create_default_file() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            return Err(anyhow::anyhow!(
                "Config file already exists at {}",
                config_path.display()
            ));
        }

        // Create directory
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&config_path, Self::example_toml())?;

        info!("Created default config at {}", config_path.display());
        Ok(config_path)
    }

    /// The documented example configuration shipped with the crate.
    pub fn example_toml() -> &'static str {
        include_str!("../../config.example.toml")
    }

    /// JSON schema describing the configuration file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }
}

impl TextConfig {
    /// Font descriptor for track labels.
    pub fn font(&self) -> FontDescriptor {
        FontDescriptor::new(
            self.font_family.clone(),
            self.font_weight.clone(),
            self.font_style.clone(),
            self.font_size,
        )
    }
}

fn clamp_or_zero(value: f64, max: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, max) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    #[test]
    fn example_config_parses_to_defaults() {
        let config: Config = toml::from_str(Config::example_toml()).unwrap();
        assert_eq!(config.scene.scale, 100.0);
        assert_eq!(config.scene.units, Unit::Meter);
        assert_eq!(config.scene.origin, Origin::Top);
        assert!(config.scene.borders);
        assert_eq!(config.page.units_per_page, "1 m");
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: Config = toml::from_str("[scene]\nscale = 25.0\n").unwrap();
        assert_eq!(config.scene.scale, 25.0);
        assert_eq!(config.scene.orientation, Orientation::Vertical);
        assert_eq!(config.cache.idle_timeout_secs, 30);
        assert_eq!(config.text.font_family, "Sans");
    }

    #[test]
    fn invalid_values_are_clamped() {
        let mut config = Config::default();
        config.scene.scale = -4.0;
        config.scene.header_height = 9000.0;
        config.cache.idle_timeout_secs = 0;
        config.page.units_per_page = "lots".to_string();
        config.text.font_size = 200.0;
        config.text.font_style = "wobbly".to_string();
        config.validate_and_clamp();

        assert_eq!(config.scene.scale, 100.0);
        assert_eq!(config.scene.header_height, 500.0);
        assert_eq!(config.cache.idle_timeout_secs, 1);
        assert_eq!(config.page.units_per_page, "1 m");
        assert_eq!(config.text.font_size, 72.0);
        assert_eq!(config.text.font_style, "normal");
    }

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.scene.scale, 100.0);
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[scene\nscale = ").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn schema_mentions_every_section() {
        let schema = serde_json::to_string(&Config::json_schema()).unwrap();
        for section in ["scene", "cache", "page", "text"] {
            assert!(schema.contains(section), "missing {section}");
        }
    }
}
