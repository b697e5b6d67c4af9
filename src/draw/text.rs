//! Pango-backed text measurement shared by drivers.
//!
//! Cairo targets lay text out through `pangocairo` on their own context.
//! Targets that only emit instructions (the script driver) still need string
//! metrics for alignment, so they measure with a [`TextMeasurer`].

use super::driver::DriverError;
use super::font::FontDescriptor;
use kurbo::Rect;
use pango::prelude::*;

/// Measures strings with the default Pango font map.
#[derive(Debug)]
pub struct TextMeasurer {
    context: pango::Context,
}

impl TextMeasurer {
    /// Fails when no font families are installed; text would be unmeasurable.
    pub fn new() -> Result<Self, DriverError> {
        let font_map = ensure_text_engine()?;
        let context = font_map.create_context();
        Ok(Self { context })
    }

    pub fn string_bounds(&self, font: &FontDescriptor, text: &str) -> Rect {
        let layout = pango::Layout::new(&self.context);
        layout_bounds(&layout, font, text)
    }
}

/// Configures `layout` for `font`/`text` and returns logical bounds
/// relative to the first baseline.
pub fn layout_bounds(layout: &pango::Layout, font: &FontDescriptor, text: &str) -> Rect {
    prepare_layout(layout, font, text);
    let (_ink, logical) = layout.extents();
    let scale = pango::SCALE as f64;
    let baseline = layout.baseline() as f64 / scale;
    let x = logical.x() as f64 / scale;
    let y = logical.y() as f64 / scale - baseline;
    Rect::new(
        x,
        y,
        x + logical.width() as f64 / scale,
        y + logical.height() as f64 / scale,
    )
}

/// Applies font and text to a layout; returns the baseline offset in pixels.
pub fn prepare_layout(layout: &pango::Layout, font: &FontDescriptor, text: &str) -> f64 {
    let desc = pango::FontDescription::from_string(&font.to_pango_string());
    layout.set_font_description(Some(&desc));
    layout.set_text(text);
    layout.baseline() as f64 / pango::SCALE as f64
}

/// Returns the default font map, or an error when it has no font families.
///
/// Drivers call this at construction so a missing text engine surfaces
/// before anything is drawn.
pub fn ensure_text_engine() -> Result<pango::FontMap, DriverError> {
    let font_map = pangocairo::FontMap::default();
    if font_map.list_families().is_empty() {
        return Err(DriverError::NoTextEngine(
            "Pango reports no font families".to_string(),
        ));
    }
    Ok(font_map)
}
