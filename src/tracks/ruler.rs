//! Depth scale with labelled ticks.

use super::{label_centered, render_title};
use crate::draw::{BLACK, GraphicsContext};
use crate::scene::{Parameters, Part, SceneLink, Track, TrackView};
use crate::units::Length;
use kurbo::{Point, Rect};
use std::any::Any;

const NATURAL_WIDTH: f64 = 60.0;
const MAJOR_TICK: f64 = 12.0;
const MINOR_TICK: f64 = 5.0;
/// Smallest distance in pixels between labelled ticks.
const MIN_LABEL_SPACING: f64 = 50.0;

/// Draws the depth axis. It has no records and no content extent of its own.
#[derive(Debug, Default)]
pub struct RulerTrack {
    parameters: Parameters,
    link: SceneLink,
}

impl RulerTrack {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Smallest of 1, 2 or 5 times a power of ten that is at least `minimum`.
pub fn tick_step(minimum: f64) -> f64 {
    if !(minimum.is_finite() && minimum > 0.0) {
        return 1.0;
    }
    let power = 10f64.powf(minimum.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * power)
        .find(|step| *step >= minimum * (1.0 - 1e-12))
        .unwrap_or(10.0 * power)
}

/// Label text for a tick value, with as many decimals as the step needs.
pub fn tick_label(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil().max(0.0) as usize
    };
    // Adding zero turns -0 into 0.
    format!("{:.*}", decimals, value + 0.0)
}

impl Track for RulerTrack {
    fn kind(&self) -> &'static str {
        "ruler"
    }

    fn title(&self) -> String {
        self.parameters.get("title").unwrap_or("Depth").to_string()
    }

    fn content_bounds(&self) -> Option<(Length, Length)> {
        None
    }

    fn natural_width(&self) -> f64 {
        self.parameters
            .get_f64("width")
            .filter(|w| *w >= 0.0)
            .unwrap_or(NATURAL_WIDTH)
    }

    fn render(&self, part: Part, ctx: &mut GraphicsContext<'_>, view: &TrackView<'_>) {
        match part {
            Part::Header => {
                let title = format!("{} ({})", self.title(), view.projection.units);
                render_title(ctx, view, &title);
            }
            Part::Contents => self.render_ticks(ctx, view),
            Part::Footer => {
                if let Some(page) = view.page {
                    ctx.set_line_color(BLACK);
                    label_centered(ctx, view, view.bounds, &format!("Page {page}"));
                }
            }
        }
    }

    fn model_count(&self) -> usize {
        0
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    fn link(&self) -> &SceneLink {
        &self.link
    }

    fn set_link(&mut self, link: SceneLink) {
        self.link = link;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl RulerTrack {
    fn render_ticks(&self, ctx: &mut GraphicsContext<'_>, view: &TrackView<'_>) {
        let projection = view.projection;
        let step = tick_step(MIN_LABEL_SPACING / projection.scale);
        let minor = step / 5.0;
        let (lo, hi) = view.visible_range();
        let (lo, hi) = (lo.value, hi.value);
        let right = view.bounds.x1;
        let label_height = view.font.size * 1.5;

        ctx.set_line_color(BLACK);
        ctx.set_line_thickness(1.0);
        ctx.draw_line(right, view.clip.y0, right, view.clip.y1);

        let first = (lo / minor).floor() as i64;
        let last = (hi / minor).ceil() as i64;
        for n in first..=last {
            let value = n as f64 * minor;
            let y = projection.to_screen(Length::new(value, projection.units));
            let major = n.rem_euclid(5) == 0;
            let length = if major { MAJOR_TICK } else { MINOR_TICK };
            ctx.draw_line(right - length, y, right, y);
            if major {
                let rect = Rect::new(
                    view.bounds.x0 + 2.0,
                    y - label_height / 2.0,
                    right - MAJOR_TICK - 2.0,
                    y + label_height / 2.0,
                );
                if rect.width() > 0.0 {
                    label_centered(ctx, view, rect, &tick_label(value, step));
                }
            }
        }
    }

    /// Depth at a screen position, for hosts showing a cursor readout.
    pub fn depth_at(&self, point: Point, view: &TrackView<'_>) -> Length {
        view.projection.to_scene(point.y)
    }
}
