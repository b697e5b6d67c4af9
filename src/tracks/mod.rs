//! Built-in tracks.

pub mod image;
pub mod ruler;
pub mod section;

pub use self::image::ImageTrack;
pub use ruler::RulerTrack;
pub use section::SectionTrack;

use crate::draw::{Color, GraphicsContext};
use crate::model::DepthRange;
use crate::scene::{Part, TrackView};
use kurbo::{Point, Rect};

/// Outline color of selected records.
pub const SELECTION: Color = Color::new(0.15, 0.4, 0.95, 1.0);

/// Draws `text` centered in `rect`, upright whichever way the scene runs.
pub(crate) fn label_centered(ctx: &mut GraphicsContext<'_>, view: &TrackView<'_>, rect: Rect, text: &str) {
    let center = rect.center();
    let rect = if view.transposed {
        Rect::from_center_size(center, (rect.height(), rect.width()))
    } else {
        rect
    };
    view.upright(ctx, center, |ctx| ctx.draw_string_centered(rect, text, view.font));
}

/// Header title, overridable through the track's `title` parameter.
pub(crate) fn render_title(ctx: &mut GraphicsContext<'_>, view: &TrackView<'_>, title: &str) {
    ctx.set_line_color(crate::draw::BLACK);
    label_centered(ctx, view, view.bounds, title);
}

/// Screen span of a record within the view's column.
pub(crate) fn record_rect<M: DepthRange>(record: &M, view: &TrackView<'_>, inset: f64) -> Rect {
    let (top, base) = view.projection.span(record.top(), record.base());
    let x0 = view.bounds.x0 + inset;
    let x1 = (view.bounds.x1 - inset).max(x0);
    Rect::new(x0, top, x1, base)
}

/// Records whose span overlaps the clip, with their indices and rectangles.
pub(crate) fn visible_records<'m, M: DepthRange>(
    records: &'m [M],
    view: &TrackView<'_>,
    inset: f64,
) -> impl Iterator<Item = (usize, &'m M, Rect)> {
    let (clip_top, clip_bottom) = (view.clip.y0, view.clip.y1);
    let bounds = view.bounds;
    let projection = *view.projection;
    records.iter().enumerate().filter_map(move |(i, record)| {
        let (top, base) = projection.span(record.top(), record.base());
        if base < clip_top || top >= clip_bottom {
            return None;
        }
        let x0 = bounds.x0 + inset;
        let x1 = (bounds.x1 - inset).max(x0);
        Some((i, record, Rect::new(x0, top, x1, base)))
    })
}

/// Index of the last-drawn record containing `point`, so the topmost wins.
pub(crate) fn hit_record<M: DepthRange>(
    records: &[M],
    point: Point,
    part: Part,
    view: &TrackView<'_>,
) -> Option<usize> {
    if part != Part::Contents {
        return None;
    }
    records
        .iter()
        .enumerate()
        .rev()
        .find(|(_, record)| {
            let rect = record_rect(*record, view, 0.0);
            point.y >= rect.y0 && point.y < rect.y1 && point.x >= rect.x0 && point.x < rect.x1
        })
        .map(|(i, _)| i)
}
