//! RGBA color type and predefined color constants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Represents an RGBA color with floating-point components.
///
/// All components are in the range 0.0 (minimum) to 1.0 (maximum).
///
/// # Examples
///
/// ```
/// use corescope::draw::Color;
/// let red = Color { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
/// let semi_transparent_blue = Color::new(0.0, 0.0, 1.0, 0.5);
/// assert_eq!(red.with_alpha(0.5).a, semi_transparent_blue.a);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Color {
    /// Red component (0.0 = no red, 1.0 = full red)
    pub r: f64,
    /// Green component (0.0 = no green, 1.0 = full green)
    pub g: f64,
    /// Blue component (0.0 = no blue, 1.0 = full blue)
    pub b: f64,
    /// Alpha/transparency (0.0 = fully transparent, 1.0 = fully opaque)
    pub a: f64,
}

impl Color {
    /// Creates a new color from RGBA components.
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color from 0-255 components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0, 1.0)
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Components quantized to 0-255, for backends that take bytes.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// CSS `rgba(...)` notation.
    pub fn to_css(self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("rgba({r},{g},{b},{})", trim_float(self.a.clamp(0.0, 1.0)))
    }

    /// Parses a named color or a `#rrggbb` / `#rrggbbaa` hex string.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                6 => Some(Self::from_rgb8(byte(0)?, byte(2)?, byte(4)?)),
                8 => Some(Self::from_rgb8(byte(0)?, byte(2)?, byte(4)?).with_alpha(byte(6)? as f64 / 255.0)),
                _ => None,
            };
        }
        name_to_color(text)
    }
}

fn trim_float(v: f64) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

/// Maps color name strings to Color values (case-insensitive).
pub fn name_to_color(name: &str) -> Option<Color> {
    match name.to_lowercase().as_str() {
        "red" => Some(RED),
        "green" => Some(GREEN),
        "blue" => Some(BLUE),
        "yellow" => Some(YELLOW),
        "orange" => Some(ORANGE),
        "white" => Some(WHITE),
        "black" => Some(BLACK),
        "gray" | "grey" => Some(GRAY),
        "light-gray" | "light-grey" => Some(LIGHT_GRAY),
        "sand" => Some(SAND),
        "transparent" => Some(TRANSPARENT),
        _ => None,
    }
}

// ============================================================================
// Predefined Color Constants
// ============================================================================

pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);

pub const GREEN: Color = Color::new(0.0, 1.0, 0.0, 1.0);

pub const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);

pub const YELLOW: Color = Color::new(1.0, 1.0, 0.0, 1.0);

pub const ORANGE: Color = Color::new(1.0, 0.5, 0.0, 1.0);

pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

/// Mid gray used for ruler ticks and placeholder hatching.
pub const GRAY: Color = Color::new(0.5, 0.5, 0.5, 1.0);

pub const LIGHT_GRAY: Color = Color::new(0.85, 0.85, 0.85, 1.0);

/// Default core-section box fill.
pub const SAND: Color = Color::new(0.93, 0.87, 0.73, 1.0);

pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_hex() {
        assert_eq!(Color::parse("Red"), Some(RED));
        assert_eq!(Color::parse("#00ff00"), Some(GREEN));
        let translucent = Color::parse("#0000ff80").unwrap();
        assert!((translucent.a - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("mauve"), None);
    }

    #[test]
    fn css_notation_trims_alpha() {
        assert_eq!(RED.to_css(), "rgba(255,0,0,1)");
        assert_eq!(BLACK.with_alpha(0.5).to_css(), "rgba(0,0,0,0.5)");
    }
}
