//! In-memory driver that records calls, for unit tests.

use super::color::Color;
use super::driver::{Driver, DriverError, ImagePlacement, ImageSource, StateStack, TextDirection};
use super::fill::{Fill, LineStyle};
use super::font::FontDescriptor;
use super::geometry::Shape;
use kurbo::{Affine, Point, Rect};

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCall {
    /// "ready", "loading" or "missing".
    pub kind: &'static str,
    /// Destination in user space.
    pub dest: Rect,
    /// Destination in device space.
    pub device: Rect,
    pub level: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Draw(Shape),
    Fill(Shape),
    Text {
        origin: Point,
        text: String,
        direction: TextDirection,
    },
    Image(ImageCall),
    EndPage,
}

#[derive(Debug, Default)]
pub struct RecordingDriver {
    state: StateStack,
    calls: Vec<Call>,
    disposed: bool,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn image_calls(&self) -> Vec<ImageCall> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Image(image) => Some(image.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Driver for RecordingDriver {
    fn draw(&mut self, shape: &Shape) {
        self.calls.push(Call::Draw(shape.clone()));
    }

    fn fill(&mut self, shape: &Shape) {
        self.calls.push(Call::Fill(shape.clone()));
    }

    fn draw_text(&mut self, origin: Point, text: &str, _font: &FontDescriptor, direction: TextDirection) {
        self.calls.push(Call::Text {
            origin,
            text: text.to_string(),
            direction,
        });
    }

    fn draw_image(&mut self, image: ImageSource<'_>, placement: ImagePlacement) {
        let (kind, natural, level) = match image {
            ImageSource::Ready(image) => ("ready", Some(image.size()), Some(image.level())),
            ImageSource::Loading => ("loading", None, None),
            ImageSource::Missing => ("missing", None, None),
        };
        let dest = placement.resolve(natural);
        self.calls.push(Call::Image(ImageCall {
            kind,
            dest,
            device: self.state.transform().transform_rect_bbox(dest),
            level,
        }));
    }

    /// Fixed-pitch metrics: 0.6 em per character, 0.8 em ascent, 0.2 em descent.
    fn string_bounds(&self, font: &FontDescriptor, text: &str) -> Rect {
        let size = font.size;
        Rect::new(
            0.0,
            -0.8 * size,
            0.6 * size * text.chars().count() as f64,
            0.2 * size,
        )
    }

    fn line_color(&self) -> Color {
        self.state.paint().line_color
    }

    fn set_line_color(&mut self, color: Color) {
        self.state.paint_mut().line_color = color;
    }

    fn line_thickness(&self) -> f64 {
        self.state.paint().line_thickness
    }

    fn set_line_thickness(&mut self, thickness: f64) {
        self.state.paint_mut().line_thickness = thickness;
    }

    fn line_style(&self) -> LineStyle {
        self.state.paint().line_style
    }

    fn set_line_style(&mut self, style: LineStyle) {
        self.state.paint_mut().line_style = style;
    }

    fn fill_style(&self) -> &Fill {
        &self.state.paint().fill
    }

    fn set_fill(&mut self, fill: Fill) {
        self.state.paint_mut().fill = fill;
    }

    fn push_state(&mut self) {
        self.state.push();
    }

    fn pop_state(&mut self) {
        self.state.pop();
    }

    fn push_transform(&mut self, transform: Affine) {
        self.state.push_transform(transform);
    }

    fn pop_transform(&mut self) {
        self.state.pop_transform();
    }

    fn transform(&self) -> Affine {
        self.state.transform()
    }

    fn clip(&self) -> Option<Rect> {
        self.state.user_clip()
    }

    fn set_clip(&mut self, rect: Rect) {
        self.state.intersect_clip(rect);
    }

    fn end_page(&mut self) {
        self.calls.push(Call::EndPage);
    }

    fn dispose(&mut self) -> Result<(), DriverError> {
        self.disposed = true;
        Ok(())
    }
}
