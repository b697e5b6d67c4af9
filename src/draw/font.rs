//! Font descriptor for text rendering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Font configuration for text rendering.
///
/// Describes which font to use, including family name, weight, style and size.
/// Every driver turns this into a backend font: Pango descriptions for the
/// Cairo targets, CSS font shorthand for the script target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FontDescriptor {
    /// Font family name (e.g., "Sans", "Monospace", "DejaVu Serif")
    pub family: String,

    /// Font weight (e.g., "normal", "bold", "light" or numeric 100-900)
    pub weight: String,

    /// Font style (e.g., "normal", "italic", "oblique")
    pub style: String,

    /// Size in points
    pub size: f64,
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            family: "Sans".to_string(),
            weight: "normal".to_string(),
            style: "normal".to_string(),
            size: 10.0,
        }
    }
}

impl FontDescriptor {
    /// Creates a new font descriptor with the specified parameters.
    pub fn new(family: impl Into<String>, weight: impl Into<String>, style: impl Into<String>, size: f64) -> Self {
        Self {
            family: family.into(),
            weight: weight.into(),
            style: style.into(),
            size,
        }
    }

    /// Same font at another size.
    pub fn with_size(&self, size: f64) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    /// Converts this font descriptor to a Pango font description string.
    ///
    /// Format: "Family Style Weight Size"
    /// Example: "Sans Bold 32" or "Monospace Italic 24"
    pub fn to_pango_string(&self) -> String {
        let mut parts = vec![self.family.clone()];

        if self.style.to_lowercase() != "normal" {
            parts.push(capitalize_first(&self.style));
        }

        if self.weight.to_lowercase() != "normal" {
            parts.push(capitalize_first(&self.weight));
        }

        parts.push(format!("{}", self.size.round() as i32));

        parts.join(" ")
    }

    /// CSS `font` shorthand, e.g. `italic bold 12px Sans`.
    pub fn to_css(&self) -> String {
        let mut parts = Vec::new();
        if self.style.to_lowercase() != "normal" {
            parts.push(self.style.to_lowercase());
        }
        if self.weight.to_lowercase() != "normal" {
            parts.push(self.weight.to_lowercase());
        }
        parts.push(format!("{}px", self.size));
        parts.push(self.family.clone());
        parts.join(" ")
    }
}

/// Capitalizes the first letter of a string.
fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pango_string_default() {
        let font = FontDescriptor::default();
        assert_eq!(font.to_pango_string(), "Sans 10");
    }

    #[test]
    fn test_pango_string_italic() {
        let font = FontDescriptor::new("Monospace", "normal", "italic", 24.0);
        assert_eq!(font.to_pango_string(), "Monospace Italic 24");
    }

    #[test]
    fn test_pango_string_custom() {
        let font = FontDescriptor::new("JetBrains Mono", "light", "normal", 16.0);
        assert_eq!(font.to_pango_string(), "JetBrains Mono Light 16");
    }

    #[test]
    fn test_css_string() {
        let font = FontDescriptor::new("Sans", "bold", "italic", 12.0);
        assert_eq!(font.to_css(), "italic bold 12px Sans");
    }
}
