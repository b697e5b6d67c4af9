//! Configuration enum types.

use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where physical value zero sits on the depth axis.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Zero at the top, depth increases downward.
    #[default]
    Top,
    /// Zero at the bottom of the content, values increase upward.
    Base,
}

impl Origin {
    /// Parses a scene parameter value, falling back to [`Origin::Top`].
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "top" => Origin::Top,
            "base" | "bottom" => Origin::Base,
            other => {
                warn!("Unknown origin '{}', using top", other);
                Origin::Top
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Top => "top",
            Origin::Base => "base",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction the depth axis runs on screen.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    /// Depth runs down the page; tracks are columns.
    #[default]
    Vertical,
    /// Depth runs left to right; tracks are rows.
    Horizontal,
}

impl Orientation {
    /// Parses a scene parameter value, falling back to [`Orientation::Vertical`].
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "vertical" => Orientation::Vertical,
            "horizontal" => Orientation::Horizontal,
            other => {
                warn!("Unknown orientation '{}', using vertical", other);
                Orientation::Vertical
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named paper sizes for paginated output.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PaperSize {
    /// US letter, 8.5 x 11 in
    #[default]
    Letter,
    /// ISO A4, 210 x 297 mm
    A4,
}
