//! Configuration type definitions.

use super::enums::{Orientation, Origin, PaperSize};
use crate::units::Unit;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scene defaults applied to every newly created scene.
///
/// Individual scene files can still override these through their own
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SceneConfig {
    /// Pixels per scene unit (valid range: 0.001 - 100000.0)
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Scene unit: mm, cm, m, km, in, ft or yd
    #[serde(default = "default_units")]
    pub units: Unit,

    /// Where depth zero sits: "top" or "base"
    #[serde(default)]
    pub origin: Origin,

    /// Depth axis direction: "vertical" or "horizontal"
    #[serde(default)]
    pub orientation: Orientation,

    /// Stroke a border around each track column
    #[serde(default = "default_borders")]
    pub borders: bool,

    /// Header band height in pixels (valid range: 0.0 - 500.0)
    #[serde(default = "default_header_height")]
    pub header_height: f64,

    /// Footer band height in pixels (valid range: 0.0 - 500.0)
    #[serde(default = "default_footer_height")]
    pub footer_height: f64,

    /// Preferred total width in pixels that elastic ("*") tracks fill
    #[serde(default)]
    pub width: Option<u32>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            units: default_units(),
            origin: Origin::default(),
            orientation: Orientation::default(),
            borders: default_borders(),
            header_height: default_header_height(),
            footer_height: default_footer_height(),
            width: None,
        }
    }
}

/// Image cache tuning.
///
/// Worker counts of 0 pick a size from the number of CPU cores.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheConfig {
    /// Directory for downloaded images (defaults to the user cache dir)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Concurrent downloads (0 = 2 x cores)
    #[serde(default)]
    pub download_workers: usize,

    /// Decodes for on-screen requests whose bytes are already local (0 = cores / 2)
    #[serde(default)]
    pub fast_workers: usize,

    /// All other decodes (0 = cores)
    #[serde(default)]
    pub scale_workers: usize,

    /// Seconds an idle worker thread lingers before exiting (valid range: 1 - 3600)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Decoded bytes kept before cached images are released, in MiB (0 = no limit)
    #[serde(default)]
    pub memory_budget_mb: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            download_workers: 0,
            fast_workers: 0,
            scale_workers: 0,
            idle_timeout_secs: default_idle_timeout(),
            memory_budget_mb: 0,
        }
    }
}

impl CacheConfig {
    /// Directory downloaded files are persisted in.
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("corescope")
                .join("images")
        })
    }
}

/// Paginated output settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageConfig {
    /// Paper size: "letter" or "a4"
    #[serde(default)]
    pub paper: PaperSize,

    /// Swap paper width and height
    #[serde(default)]
    pub landscape: bool,

    /// Physical length shown on each page, e.g. "1 m" or "5 ft"
    #[serde(default = "default_units_per_page")]
    pub units_per_page: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            paper: PaperSize::default(),
            landscape: false,
            units_per_page: default_units_per_page(),
        }
    }
}

/// Label font used by the built-in tracks.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TextConfig {
    /// Font family name (e.g., "Sans", "Monospace")
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font size in points (valid range: 4.0 - 72.0)
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// Font weight (e.g., "normal", "bold", 400, 700)
    #[serde(default = "default_font_weight")]
    pub font_weight: String,

    /// Font style ("normal", "italic", "oblique")
    #[serde(default = "default_font_style")]
    pub font_style: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            font_weight: default_font_weight(),
            font_style: default_font_style(),
        }
    }
}

fn default_scale() -> f64 {
    100.0
}

fn default_units() -> Unit {
    Unit::Meter
}

fn default_borders() -> bool {
    true
}

fn default_header_height() -> f64 {
    40.0
}

fn default_footer_height() -> f64 {
    20.0
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_units_per_page() -> String {
    "1 m".to_string()
}

fn default_font_family() -> String {
    "Sans".to_string()
}

fn default_font_size() -> f64 {
    10.0
}

fn default_font_weight() -> String {
    "normal".to_string()
}

fn default_font_style() -> String {
    "normal".to_string()
}
