//! The backend-neutral drawing interface.
//!
//! A [`Driver`] turns primitive draw calls plus a paint-state stack into
//! backend operations. Backends share the bookkeeping in [`StateStack`]
//! rather than inheriting from each other.

use super::color::Color;
use super::fill::{Fill, LineStyle, PaintState};
use super::font::FontDescriptor;
use super::geometry::Shape;
use crate::cache::DecodedImage;
use kurbo::{Affine, Point, Rect};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while constructing or finishing a driver.
///
/// Individual draw calls never fail; only setting up a backend (or flushing
/// its output) can.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no text engine available: {0}")]
    NoTextEngine(String),

    #[error("cairo error: {0}")]
    Cairo(#[from] cairo::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("invalid surface size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
}

/// Direction text runs from its baseline anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Horizontal,
    /// Rotated a quarter turn counter-clockwise; reads bottom to top.
    Vertical,
}

/// What to paint for an image draw call.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Ready(&'a Arc<DecodedImage>),
    /// Requested but not decoded yet.
    Loading,
    /// Could not be fetched or decoded.
    Missing,
}

/// Where an image lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImagePlacement {
    /// Top-left corner; natural decoded size.
    At(Point),
    /// Stretched to fill the rectangle.
    Into(Rect),
}

/// Edge length of the placeholder drawn for an unsized image that has no pixels.
pub const PLACEHOLDER_SIZE: f64 = 32.0;

impl ImagePlacement {
    /// Destination rectangle for an image of the given natural size.
    pub fn resolve(self, natural: Option<(f64, f64)>) -> Rect {
        match self {
            ImagePlacement::Into(rect) => rect.abs(),
            ImagePlacement::At(p) => {
                let (w, h) = natural.unwrap_or((PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));
                Rect::new(p.x, p.y, p.x + w, p.y + h)
            }
        }
    }
}

/// Output backend contract.
///
/// Paint and transform stacks are independent and strictly LIFO. Popping an
/// empty stack does nothing. The clip is saved and restored with the paint
/// state.
pub trait Driver {
    /// Strokes the outline of a shape with the current line settings.
    fn draw(&mut self, shape: &Shape);

    /// Fills the interior of a shape with the current fill.
    fn fill(&mut self, shape: &Shape);

    /// Draws text with its baseline starting at `origin`.
    fn draw_text(&mut self, origin: Point, text: &str, font: &FontDescriptor, direction: TextDirection);

    fn draw_image(&mut self, image: ImageSource<'_>, placement: ImagePlacement);

    /// Logical bounds of `text` relative to its baseline origin (y < 0 above).
    fn string_bounds(&self, font: &FontDescriptor, text: &str) -> Rect;

    fn line_color(&self) -> Color;
    fn set_line_color(&mut self, color: Color);
    fn line_thickness(&self) -> f64;
    fn set_line_thickness(&mut self, thickness: f64);
    fn line_style(&self) -> LineStyle;
    fn set_line_style(&mut self, style: LineStyle);
    fn fill_style(&self) -> &Fill;
    fn set_fill(&mut self, fill: Fill);

    fn push_state(&mut self);
    fn pop_state(&mut self);

    /// Applies `transform` on top of the current one (it acts on points first).
    fn push_transform(&mut self, transform: Affine);
    fn pop_transform(&mut self);

    /// Current user-to-device transform.
    fn transform(&self) -> Affine;

    /// Current clip in user space, `None` when unclipped.
    fn clip(&self) -> Option<Rect>;

    /// Intersects the clip with `rect` (user space).
    fn set_clip(&mut self, rect: Rect);

    /// Finishes the current page on paginated targets.
    fn end_page(&mut self) {}

    /// Flushes output and releases backend resources.
    fn dispose(&mut self) -> Result<(), DriverError>;
}

/// Paint-state, transform and clip bookkeeping shared by the drivers.
#[derive(Debug, Clone)]
pub struct StateStack {
    current: PaintState,
    saved: Vec<(PaintState, Option<Rect>)>,
    transform: Affine,
    transforms: Vec<Affine>,
    /// Clip in device space.
    clip: Option<Rect>,
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStack {
    pub fn new() -> Self {
        Self::with_transform(Affine::IDENTITY)
    }

    /// Starts from a base transform that pops can never remove.
    pub fn with_transform(base: Affine) -> Self {
        Self {
            current: PaintState::default(),
            saved: Vec::new(),
            transform: base,
            transforms: Vec::new(),
            clip: None,
        }
    }

    pub fn paint(&self) -> &PaintState {
        &self.current
    }

    pub fn paint_mut(&mut self) -> &mut PaintState {
        &mut self.current
    }

    pub fn push(&mut self) {
        self.saved.push((self.current.clone(), self.clip));
    }

    /// Restores the last pushed state. Returns `false` on an empty stack.
    pub fn pop(&mut self) -> bool {
        match self.saved.pop() {
            Some((paint, clip)) => {
                self.current = paint;
                self.clip = clip;
                true
            }
            None => {
                log::warn!("pop_state called with no saved state");
                false
            }
        }
    }

    pub fn push_transform(&mut self, transform: Affine) {
        self.transforms.push(self.transform);
        self.transform = self.transform * transform;
    }

    /// Restores the previous transform. Returns `false` on an empty stack.
    pub fn pop_transform(&mut self) -> bool {
        match self.transforms.pop() {
            Some(previous) => {
                self.transform = previous;
                true
            }
            None => {
                log::warn!("pop_transform called with no saved transform");
                false
            }
        }
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    pub fn device_clip(&self) -> Option<Rect> {
        self.clip
    }

    /// Clip mapped back into the current user space.
    pub fn user_clip(&self) -> Option<Rect> {
        let clip = self.clip?;
        if self.transform.determinant().abs() < f64::EPSILON {
            return Some(Rect::ZERO);
        }
        Some(self.transform.inverse().transform_rect_bbox(clip))
    }

    /// Intersects the device clip with `rect` mapped through the transform.
    pub fn intersect_clip(&mut self, rect: Rect) -> Rect {
        let device = self.transform.transform_rect_bbox(rect.abs());
        let next = match self.clip {
            Some(existing) => {
                let i = existing.intersect(device);
                if i.width() < 0.0 || i.height() < 0.0 {
                    Rect::new(i.x0, i.y0, i.x0, i.y0)
                } else {
                    i
                }
            }
            None => device,
        };
        self.clip = Some(next);
        next
    }

    /// Depths of the paint and transform stacks, for leak warnings.
    pub fn depths(&self) -> (usize, usize) {
        (self.saved.len(), self.transforms.len())
    }

    /// Logs a warning when pushes were left unmatched.
    pub fn warn_unbalanced(&self, backend: &str) {
        let (states, transforms) = self.depths();
        if states > 0 || transforms > 0 {
            log::warn!(
                "{} driver disposed with {} unmatched push_state and {} unmatched push_transform",
                backend,
                states,
                transforms
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::color::{BLUE, RED};

    #[test]
    fn paint_state_is_lifo() {
        let mut stack = StateStack::new();
        stack.paint_mut().line_color = RED;
        stack.push();
        stack.paint_mut().line_color = BLUE;
        stack.paint_mut().line_thickness = 4.0;
        assert!(stack.pop());
        assert_eq!(stack.paint().line_color, RED);
        assert_eq!(stack.paint().line_thickness, 1.0);
    }

    #[test]
    fn popping_empty_stacks_is_a_no_op() {
        let mut stack = StateStack::new();
        stack.paint_mut().line_color = RED;
        assert!(!stack.pop());
        assert!(!stack.pop_transform());
        assert_eq!(stack.paint().line_color, RED);
        assert_eq!(stack.transform(), Affine::IDENTITY);
    }

    #[test]
    fn transforms_compose_last_pushed_first_applied() {
        let mut stack = StateStack::new();
        stack.push_transform(Affine::translate((10.0, 0.0)));
        stack.push_transform(Affine::scale(2.0));
        // Scale applies first, then translate.
        let p = stack.transform() * Point::new(1.0, 1.0);
        assert_eq!(p, Point::new(12.0, 2.0));
        stack.pop_transform();
        let p = stack.transform() * Point::new(1.0, 1.0);
        assert_eq!(p, Point::new(11.0, 1.0));
    }

    #[test]
    fn clip_intersects_and_restores_with_state() {
        let mut stack = StateStack::new();
        stack.intersect_clip(Rect::new(0.0, 0.0, 100.0, 100.0));
        stack.push();
        stack.intersect_clip(Rect::new(50.0, 50.0, 150.0, 150.0));
        assert_eq!(stack.device_clip(), Some(Rect::new(50.0, 50.0, 100.0, 100.0)));
        stack.pop();
        assert_eq!(stack.device_clip(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn user_clip_follows_transform() {
        let mut stack = StateStack::new();
        stack.intersect_clip(Rect::new(0.0, 0.0, 100.0, 100.0));
        stack.push_transform(Affine::translate((0.0, 40.0)));
        assert_eq!(stack.user_clip(), Some(Rect::new(0.0, -40.0, 100.0, 60.0)));
    }

    #[test]
    fn disjoint_clips_collapse_to_empty() {
        let mut stack = StateStack::new();
        stack.intersect_clip(Rect::new(0.0, 0.0, 10.0, 10.0));
        let clip = stack.intersect_clip(Rect::new(20.0, 20.0, 30.0, 30.0));
        assert_eq!(clip.area(), 0.0);
    }

    #[test]
    fn at_placement_uses_natural_size() {
        let rect = ImagePlacement::At(Point::new(5.0, 6.0)).resolve(Some((10.0, 20.0)));
        assert_eq!(rect, Rect::new(5.0, 6.0, 15.0, 26.0));
        let rect = ImagePlacement::At(Point::ORIGIN).resolve(None);
        assert_eq!(rect.width(), PLACEHOLDER_SIZE);
    }
}
