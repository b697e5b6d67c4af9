//! Mapping between depth values and scene pixels.

use crate::config::Origin;
use crate::units::{Length, Unit};

/// Resolved depth-axis mapping of a laid-out scene.
///
/// With `Origin::Top` a depth `p` lands at `p * scale`. With `Origin::Base`
/// it lands at `max - p * scale + min`, where `min..max` are the pixel
/// bounds of the content, so the content is mirrored in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Pixels per scene unit.
    pub scale: f64,
    pub units: Unit,
    pub origin: Origin,
    /// Pixel bounds of the content, `(0, 0)` when the scene is empty.
    pub content: (f64, f64),
}

impl Projection {
    pub fn new(scale: f64, units: Unit, origin: Origin, content: (f64, f64)) -> Self {
        Self {
            scale,
            units,
            origin,
            content,
        }
    }

    /// Screen position of a depth.
    pub fn to_screen(&self, depth: Length) -> f64 {
        let scaled = depth.value_in(self.units) * self.scale;
        match self.origin {
            Origin::Top => scaled,
            Origin::Base => self.content.1 - scaled + self.content.0,
        }
    }

    /// Depth at a screen position, in scene units.
    pub fn to_scene(&self, y: f64) -> Length {
        let scaled = match self.origin {
            Origin::Top => y,
            Origin::Base => self.content.1 + self.content.0 - y,
        };
        Length::new(scaled / self.scale, self.units)
    }

    /// Screen span of a depth interval, top edge first.
    pub fn span(&self, top: Length, base: Length) -> (f64, f64) {
        let a = self.to_screen(top);
        let b = self.to_screen(base);
        if b < a { (b, a) } else { (a, b) }
    }

    pub fn content_height(&self) -> f64 {
        self.content.1 - self.content.0
    }
}
