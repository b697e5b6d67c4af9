//! Core-face scans stretched over their depth interval.

use super::{SELECTION, hit_record, render_title, visible_records};
use crate::draw::GraphicsContext;
use crate::model::{CoreImage, union_extent};
use crate::scene::{Parameters, Part, SceneLink, Track, TrackCore, TrackView};
use crate::units::Length;
use kurbo::Point;
use std::any::Any;

const NATURAL_WIDTH: f64 = 120.0;

/// Draws each image into its column between its top and base depth.
///
/// Pixels come from the context's image loader; without one, or while an
/// image is unavailable, the driver's placeholder is drawn instead.
#[derive(Debug, Default)]
pub struct ImageTrack {
    core: TrackCore<CoreImage>,
}

impl ImageTrack {
    pub fn new(images: Vec<CoreImage>) -> Self {
        Self {
            core: TrackCore::new(images),
        }
    }

    pub fn images(&self) -> &[CoreImage] {
        self.core.models()
    }

    pub fn add_image(&mut self, image: CoreImage) {
        self.core.push(image);
    }

    pub fn remove_image(&mut self, index: usize) -> Option<CoreImage> {
        self.core.remove(index)
    }

    pub fn set_images(&mut self, images: Vec<CoreImage>) {
        self.core.set_models(images);
    }

    /// Horizontal padding inside the column, from the `padding` parameter.
    fn padding(&self) -> f64 {
        self.core
            .parameters()
            .get_f64("padding")
            .map_or(0.0, |p| p.max(0.0))
    }
}

impl Track for ImageTrack {
    fn kind(&self) -> &'static str {
        "image"
    }

    fn title(&self) -> String {
        self.core.parameters().get("title").unwrap_or("Core images").to_string()
    }

    fn content_bounds(&self) -> Option<(Length, Length)> {
        union_extent(self.core.models())
    }

    fn natural_width(&self) -> f64 {
        self.core.width_or(NATURAL_WIDTH)
    }

    fn render(&self, part: Part, ctx: &mut GraphicsContext<'_>, view: &TrackView<'_>) {
        match part {
            Part::Header => render_title(ctx, view, &self.title()),
            Part::Footer => {}
            Part::Contents => {
                let padding = self.padding();
                for (index, image, rect) in visible_records(self.core.models(), view, padding) {
                    if rect.width() <= 0.0 || rect.height() <= 0.0 {
                        continue;
                    }
                    ctx.draw_image_url(&image.url, image.orientation, rect);
                    if view.is_selected(index) {
                        ctx.set_line_color(SELECTION);
                        ctx.set_line_thickness(2.0);
                        ctx.stroke_rect(rect);
                    }
                }
            }
        }
    }

    fn find_model(&self, point: Point, part: Part, view: &TrackView<'_>) -> Option<usize> {
        hit_record(self.core.models(), point, part, view)
    }

    fn model_count(&self) -> usize {
        self.core.models().len()
    }

    fn parameters(&self) -> &Parameters {
        self.core.parameters()
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        self.core.parameters_mut()
    }

    fn link(&self) -> &SceneLink {
        self.core.link()
    }

    fn set_link(&mut self, link: SceneLink) {
        self.core.set_link(link);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
