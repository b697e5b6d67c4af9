//! Domain records the built-in tracks draw.
//!
//! Loaders for project files live outside this crate; they hand the scene
//! these already-parsed records.

use crate::cache::ImageOrientation;
use crate::units::Length;
use serde::{Deserialize, Serialize};

/// Anything occupying an interval of the depth axis.
pub trait DepthRange {
    fn top(&self) -> Length;
    fn base(&self) -> Length;

    /// Shallower and deeper ends, whichever way round the record stores them.
    fn extent(&self) -> (Length, Length) {
        let (top, base) = (self.top(), self.base());
        if base < top { (base, top) } else { (top, base) }
    }
}

/// A labelled interval of core, e.g. one box or one drilled run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(with = "crate::units::text")]
    pub top: Length,
    #[serde(with = "crate::units::text")]
    pub base: Length,
}

impl Section {
    pub fn new(name: impl Into<String>, top: Length, base: Length) -> Self {
        Self {
            name: name.into(),
            top,
            base,
        }
    }
}

impl DepthRange for Section {
    fn top(&self) -> Length {
        self.top
    }

    fn base(&self) -> Length {
        self.base
    }
}

/// A scanned image of the core face covering `top..base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreImage {
    /// Local path or URL.
    pub url: String,
    #[serde(with = "crate::units::text")]
    pub top: Length,
    #[serde(with = "crate::units::text")]
    pub base: Length,
    #[serde(default)]
    pub orientation: ImageOrientation,
    /// Scan resolution, if known.
    #[serde(default)]
    pub dpi: Option<f64>,
}

impl CoreImage {
    pub fn new(url: impl Into<String>, top: Length, base: Length) -> Self {
        Self {
            url: url.into(),
            top,
            base,
            orientation: ImageOrientation::Vertical,
            dpi: None,
        }
    }

    pub fn with_orientation(mut self, orientation: ImageOrientation) -> Self {
        self.orientation = orientation;
        self
    }
}

impl DepthRange for CoreImage {
    fn top(&self) -> Length {
        self.top
    }

    fn base(&self) -> Length {
        self.base
    }
}

/// Smallest interval covering every record, `None` for an empty list.
pub fn union_extent<'a, T: DepthRange + 'a>(
    records: impl IntoIterator<Item = &'a T>,
) -> Option<(Length, Length)> {
    records.into_iter().fold(None, |acc, record| {
        let (top, base) = record.extent();
        Some(match acc {
            None => (top, base),
            Some((lo, hi)) => (lo.min(top), hi.max(base)),
        })
    })
}
