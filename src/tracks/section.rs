//! Labelled core sections drawn as filled boxes.

use super::{SELECTION, hit_record, label_centered, render_title, visible_records};
use crate::draw::{BLACK, Color, GraphicsContext, SAND};
use crate::model::{Section, union_extent};
use crate::scene::{Parameters, Part, SceneLink, Track, TrackCore, TrackView};
use crate::units::Length;
use kurbo::Point;
use std::any::Any;

const NATURAL_WIDTH: f64 = 80.0;
const INSET: f64 = 2.0;

#[derive(Debug, Default)]
pub struct SectionTrack {
    core: TrackCore<Section>,
}

impl SectionTrack {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            core: TrackCore::new(sections),
        }
    }

    pub fn sections(&self) -> &[Section] {
        self.core.models()
    }

    pub fn add_section(&mut self, section: Section) {
        self.core.push(section);
    }

    pub fn remove_section(&mut self, index: usize) -> Option<Section> {
        self.core.remove(index)
    }

    pub fn set_sections(&mut self, sections: Vec<Section>) {
        self.core.set_models(sections);
    }

    fn fill_color(&self) -> Color {
        self.core
            .parameters()
            .get("fill")
            .and_then(Color::parse)
            .unwrap_or(SAND)
    }
}

impl Track for SectionTrack {
    fn kind(&self) -> &'static str {
        "section"
    }

    fn title(&self) -> String {
        self.core.parameters().get("title").unwrap_or("Sections").to_string()
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
                let fill = self.fill_color();
                for (index, section, rect) in visible_records(self.core.models(), view, INSET) {
                    ctx.set_fill(fill);
                    ctx.paint_rect(rect);
                    if view.is_selected(index) {
                        ctx.set_line_color(SELECTION);
                        ctx.set_line_thickness(2.0);
                    } else {
                        ctx.set_line_color(BLACK);
                        ctx.set_line_thickness(1.0);
                    }
                    ctx.stroke_rect(rect);

                    let bounds = ctx.string_bounds(view.font, &section.name);
                    let (along, across) = if view.transposed {
                        (rect.width(), rect.height())
                    } else {
                        (rect.height(), rect.width())
                    };
                    if bounds.height() <= along && bounds.width() <= across {
                        ctx.set_line_color(BLACK);
                        label_centered(ctx, view, rect, &section.name);
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
