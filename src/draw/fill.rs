//! Fill and stroke style values shared by every driver.

use super::color::{BLACK, Color, TRANSPARENT};
use crate::cache::DecodedImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Direction a gradient runs across the filled shape's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GradientAxis {
    /// Left edge = start color, right edge = end color.
    Horizontal,
    /// Top edge = start color, bottom edge = end color.
    Vertical,
}

/// How the interior of a shape is painted.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Color(Color),
    /// Linear gradient spanning the bounding box of whatever shape is filled.
    Gradient {
        start: Color,
        end: Color,
        axis: GradientAxis,
    },
    /// Image tiled from the user-space origin.
    Texture(Arc<DecodedImage>),
    /// Each child fills the same outline in order; later children paint on top.
    Composite(Vec<Fill>),
}

impl Fill {
    pub fn color(color: Color) -> Self {
        Fill::Color(color)
    }

    pub fn gradient(start: Color, end: Color, axis: GradientAxis) -> Self {
        Fill::Gradient { start, end, axis }
    }

    /// True when filling with this value can never change a pixel.
    pub fn is_invisible(&self) -> bool {
        match self {
            Fill::Color(c) => c.a <= 0.0,
            Fill::Gradient { start, end, .. } => start.a <= 0.0 && end.a <= 0.0,
            Fill::Texture(_) => false,
            Fill::Composite(children) => children.iter().all(Fill::is_invisible),
        }
    }

    /// Visits the leaf fills in paint order, flattening nested composites.
    pub fn for_each_layer(&self, f: &mut impl FnMut(&Fill)) {
        match self {
            Fill::Composite(children) => {
                for child in children {
                    child.for_each_layer(f);
                }
            }
            other => f(other),
        }
    }
}

impl Default for Fill {
    fn default() -> Self {
        Fill::Color(TRANSPARENT)
    }
}

impl From<Color> for Fill {
    fn from(color: Color) -> Self {
        Fill::Color(color)
    }
}

/// Named stroke styles; each backend picks its own dash pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    /// Dash pattern in multiples of the line thickness (empty = solid).
    pub fn dash_pattern(self, thickness: f64) -> Vec<f64> {
        let t = thickness.max(1.0);
        match self {
            LineStyle::Solid => Vec::new(),
            LineStyle::Dashed => vec![6.0 * t, 4.0 * t],
            LineStyle::Dotted => vec![t, 2.0 * t],
            LineStyle::DashDot => vec![6.0 * t, 3.0 * t, t, 3.0 * t],
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "solid" => Some(LineStyle::Solid),
            "dashed" => Some(LineStyle::Dashed),
            "dotted" => Some(LineStyle::Dotted),
            "dash-dot" | "dashdot" => Some(LineStyle::DashDot),
            _ => None,
        }
    }
}

/// The four pieces of paint state pushed and popped together.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintState {
    pub line_color: Color,
    pub line_thickness: f64,
    pub line_style: LineStyle,
    pub fill: Fill,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            line_color: BLACK,
            line_thickness: 1.0,
            line_style: LineStyle::Solid,
            fill: Fill::Color(BLACK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::color::{RED, WHITE};

    #[test]
    fn composite_layers_flatten_in_order() {
        let fill = Fill::Composite(vec![
            Fill::Color(RED),
            Fill::Composite(vec![Fill::Color(WHITE), Fill::Color(BLACK)]),
        ]);
        let mut seen = Vec::new();
        fill.for_each_layer(&mut |layer| {
            if let Fill::Color(c) = layer {
                seen.push(*c);
            }
        });
        assert_eq!(seen, vec![RED, WHITE, BLACK]);
    }

    #[test]
    fn dash_patterns_are_distinct() {
        let patterns: Vec<_> = [
            LineStyle::Solid,
            LineStyle::Dashed,
            LineStyle::Dotted,
            LineStyle::DashDot,
        ]
        .iter()
        .map(|s| s.dash_pattern(2.0))
        .collect();
        for (i, a) in patterns.iter().enumerate() {
            for b in &patterns[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn invisible_fills() {
        assert!(Fill::default().is_invisible());
        assert!(!Fill::Color(RED).is_invisible());
        assert!(Fill::Composite(vec![Fill::default()]).is_invisible());
    }
}
