//! Primitive shapes and the geometry helpers drivers share.
//!
//! The arc flattening here is used by backends without a native elliptical
//! arc: an arc is split into cubic Bézier segments, bisecting any segment
//! whose measured deviation from the true ellipse exceeds [`ARC_TOLERANCE`].

use kurbo::{Affine, Point, Rect};

/// Maximum deviation, in device pixels, of an approximated arc from the ellipse.
pub const ARC_TOLERANCE: f64 = 0.1;

/// Upper bound on Bézier segments emitted for a single arc.
pub const MAX_ARC_SEGMENTS: usize = 64;

/// How the ends of an arc are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcStyle {
    /// Just the curve.
    Open,
    /// Curve closed by a straight chord between its end points.
    Chord,
    /// Curve closed through the ellipse center (pie sector).
    Pie,
}

/// Drawing primitives understood by every driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line { from: Point, to: Point },
    Rect(Rect),
    /// Ellipse inscribed in the rectangle.
    Oval(Rect),
    /// Elliptical arc of the ellipse inscribed in `bounds`.
    ///
    /// `start` and `extent` are degrees, counter-clockwise from the positive
    /// x axis, in the unrotated frame of `bounds`. Angles are measured on the
    /// unit circle before it is stretched to the ellipse, so 45° always lies on
    /// the diagonal of `bounds`.
    Arc {
        bounds: Rect,
        start: f64,
        extent: f64,
        style: ArcStyle,
    },
    Polygon(Vec<Point>),
    Point(Point),
}

impl Shape {
    /// Axis-aligned bounding box in user space.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Shape::Line { from, to } => Rect::from_points(*from, *to),
            Shape::Rect(r) | Shape::Oval(r) => r.abs(),
            Shape::Arc { bounds, .. } => bounds.abs(),
            Shape::Polygon(points) => points_bounds(points),
            Shape::Point(p) => Rect::from_points(*p, *p),
        }
    }
}

fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
}

/// One cubic Bézier segment: start, two control points, end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl CubicSegment {
    pub fn eval(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.p0.x + b * self.p1.x + c * self.p2.x + d * self.p3.x,
            a * self.p0.y + b * self.p1.y + c * self.p2.y + d * self.p3.y,
        )
    }
}

/// An ellipse in user space, as arcs see it.
#[derive(Debug, Clone, Copy)]
struct Ellipse {
    center: Point,
    rx: f64,
    ry: f64,
}

impl Ellipse {
    fn from_bounds(bounds: Rect) -> Self {
        let b = bounds.abs();
        Self {
            center: b.center(),
            rx: b.width() / 2.0,
            ry: b.height() / 2.0,
        }
    }

    /// Point at parametric angle `theta` (radians, counter-clockwise, y down).
    fn point(&self, theta: f64) -> Point {
        Point::new(
            self.center.x + self.rx * theta.cos(),
            self.center.y - self.ry * theta.sin(),
        )
    }

    /// Cubic approximating the arc from `a0` sweeping `sweep` radians.
    fn segment(&self, a0: f64, sweep: f64) -> CubicSegment {
        let a1 = a0 + sweep;
        let k = 4.0 / 3.0 * (sweep / 4.0).tan();
        let (s0, c0) = a0.sin_cos();
        let (s1, c1) = a1.sin_cos();
        let p0 = self.point(a0);
        let p3 = self.point(a1);
        // Tangent of (cos t, -sin t) scaled by the radii is (-sin t, -cos t).
        let p1 = Point::new(p0.x - k * self.rx * s0, p0.y - k * self.ry * c0);
        let p2 = Point::new(p3.x + k * self.rx * s1, p3.y + k * self.ry * c1);
        CubicSegment { p0, p1, p2, p3 }
    }

    /// Largest sampled distance between the cubic and the true ellipse,
    /// measured after mapping both through `transform`.
    ///
    /// Each sample is projected radially (in unit-circle space) onto the
    /// ellipse, so only the shape error counts, not the parametrization.
    fn deviation(&self, seg: &CubicSegment, transform: Affine) -> f64 {
        [0.25, 0.5, 0.75]
            .iter()
            .map(|&t| {
                let p = seg.eval(t);
                let nx = (p.x - self.center.x) / self.rx;
                let ny = (self.center.y - p.y) / self.ry;
                let on_ellipse = self.point(ny.atan2(nx));
                (transform * p).distance(transform * on_ellipse)
            })
            .fold(0.0, f64::max)
    }
}

/// Approximates an elliptical arc with cubic Béziers.
///
/// Starts from segments no wider than 90°, then bisects every segment whose
/// deviation (in the device space given by `transform`) exceeds
/// `tolerance`. Stops splitting once [`MAX_ARC_SEGMENTS`] would be exceeded,
/// so a degenerate transform can never loop forever.
pub fn arc_to_cubics(
    bounds: Rect,
    start_deg: f64,
    extent_deg: f64,
    transform: Affine,
    tolerance: f64,
) -> Vec<CubicSegment> {
    let ellipse = Ellipse::from_bounds(bounds);
    if extent_deg == 0.0 || ellipse.rx <= 0.0 || ellipse.ry <= 0.0 {
        return Vec::new();
    }

    let extent_deg = extent_deg.clamp(-360.0, 360.0);
    let start = start_deg.to_radians();
    let extent = extent_deg.to_radians();
    let initial = (extent_deg.abs() / 90.0).ceil().max(1.0) as usize;
    let sweep = extent / initial as f64;

    let mut spans: Vec<(f64, f64)> = (0..initial)
        .map(|i| (start + sweep * i as f64, sweep))
        .collect();

    // Bisect until every span is within tolerance or the budget runs out.
    loop {
        let mut refined = Vec::with_capacity(spans.len() * 2);
        let mut split_any = false;
        let mut budget = MAX_ARC_SEGMENTS.saturating_sub(spans.len());
        for &(a0, w) in &spans {
            let seg = ellipse.segment(a0, w);
            if budget > 0 && ellipse.deviation(&seg, transform) > tolerance {
                refined.push((a0, w / 2.0));
                refined.push((a0 + w / 2.0, w / 2.0));
                budget -= 1;
                split_any = true;
            } else {
                refined.push((a0, w));
            }
        }
        spans = refined;
        if !split_any {
            break;
        }
    }

    spans
        .into_iter()
        .map(|(a0, w)| ellipse.segment(a0, w))
        .collect()
}

/// Path element sequence for an arc, including its chord/pie closure.
#[derive(Debug, Clone, PartialEq)]
pub enum PathOp {
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
    Close,
}

/// Builds the outline of an arc shape out of line and cubic operations.
pub fn arc_path(
    bounds: Rect,
    start: f64,
    extent: f64,
    style: ArcStyle,
    transform: Affine,
) -> Vec<PathOp> {
    let segments = arc_to_cubics(bounds, start, extent, transform, ARC_TOLERANCE);
    let Some(first) = segments.first() else {
        return Vec::new();
    };

    let mut ops = Vec::with_capacity(segments.len() + 3);
    let center = bounds.abs().center();
    if style == ArcStyle::Pie {
        ops.push(PathOp::MoveTo(center));
        ops.push(PathOp::LineTo(first.p0));
    } else {
        ops.push(PathOp::MoveTo(first.p0));
    }
    for seg in &segments {
        ops.push(PathOp::CurveTo(seg.p1, seg.p2, seg.p3));
    }
    if style != ArcStyle::Open {
        ops.push(PathOp::Close);
    }
    ops
}

/// Full ellipse outline as four-or-more cubics.
pub fn oval_path(bounds: Rect, transform: Affine) -> Vec<PathOp> {
    arc_path(bounds, 0.0, 360.0, ArcStyle::Chord, transform)
}

/// Device-space bounding box of a user-space rectangle.
pub fn transform_rect_bbox(transform: Affine, rect: Rect) -> Rect {
    transform.transform_rect_bbox(rect)
}

/// Diagonal hatch lines covering `rect`, spaced `spacing` apart.
///
/// Placeholders for missing or still-loading images are drawn with these.
pub fn hatch_lines(rect: Rect, spacing: f64) -> Vec<(Point, Point)> {
    let rect = rect.abs();
    if rect.width() <= 0.0 || rect.height() <= 0.0 || spacing <= 0.0 {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let span = rect.width() + rect.height();
    let mut offset = spacing;
    while offset < span {
        // Line x + y = rect.x0 + rect.y0 + offset clipped to the rectangle.
        let start = Point::new(
            rect.x0 + (offset - rect.height()).max(0.0),
            rect.y0 + offset.min(rect.height()),
        );
        let end = Point::new(
            rect.x0 + offset.min(rect.width()),
            rect.y0 + (offset - rect.width()).max(0.0),
        );
        lines.push((start, end));
        offset += spacing;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle() -> Rect {
        Rect::new(-100.0, -100.0, 100.0, 100.0)
    }

    #[test]
    fn quarter_arc_starts_and_ends_on_axes() {
        let segs = arc_to_cubics(circle(), 0.0, 90.0, Affine::IDENTITY, ARC_TOLERANCE);
        let first = segs.first().unwrap();
        let last = segs.last().unwrap();
        assert!(first.p0.distance(Point::new(100.0, 0.0)) < 1e-9);
        // Counter-clockwise with y down ends at the top of the circle.
        assert!(last.p3.distance(Point::new(0.0, -100.0)) < 1e-9);
    }

    #[test]
    fn segments_stay_within_tolerance() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 120.0);
        let ellipse = Ellipse::from_bounds(bounds);
        let segs = arc_to_cubics(bounds, 30.0, 300.0, Affine::IDENTITY, ARC_TOLERANCE);
        assert!(segs.len() >= 4);
        for seg in &segs {
            for t in [0.1, 0.3, 0.5, 0.7, 0.9] {
                let p = seg.eval(t);
                // Normalized ellipse equation should be close to 1.
                let nx = (p.x - ellipse.center.x) / ellipse.rx;
                let ny = (p.y - ellipse.center.y) / ellipse.ry;
                let r = (nx * nx + ny * ny).sqrt();
                assert!((r - 1.0).abs() * ellipse.rx.max(ellipse.ry) < 1.0);
            }
        }
    }

    #[test]
    fn larger_device_scale_needs_more_segments() {
        let small = arc_to_cubics(circle(), 0.0, 360.0, Affine::IDENTITY, 0.1);
        let large = arc_to_cubics(circle(), 0.0, 360.0, Affine::scale(50.0), 0.1);
        assert!(large.len() > small.len());
    }

    #[test]
    fn segment_count_is_bounded() {
        let segs = arc_to_cubics(circle(), 0.0, 360.0, Affine::scale(1e9), 1e-9);
        assert!(segs.len() <= MAX_ARC_SEGMENTS);
    }

    #[test]
    fn negative_extent_runs_clockwise() {
        let segs = arc_to_cubics(circle(), 0.0, -90.0, Affine::IDENTITY, ARC_TOLERANCE);
        let last = segs.last().unwrap();
        assert!(last.p3.distance(Point::new(0.0, 100.0)) < 1e-9);
    }

    #[test]
    fn pie_path_passes_through_center() {
        let ops = arc_path(circle(), 0.0, 45.0, ArcStyle::Pie, Affine::IDENTITY);
        assert_eq!(ops.first(), Some(&PathOp::MoveTo(Point::ORIGIN)));
        assert_eq!(ops.last(), Some(&PathOp::Close));
        let open = arc_path(circle(), 0.0, 45.0, ArcStyle::Open, Affine::IDENTITY);
        assert_ne!(open.last(), Some(&PathOp::Close));
    }

    #[test]
    fn empty_arcs_produce_nothing() {
        assert!(arc_to_cubics(circle(), 0.0, 0.0, Affine::IDENTITY, 0.1).is_empty());
        assert!(
            arc_to_cubics(Rect::new(0.0, 0.0, 0.0, 10.0), 0.0, 90.0, Affine::IDENTITY, 0.1)
                .is_empty()
        );
    }

    #[test]
    fn hatch_lines_stay_inside_rect() {
        let rect = Rect::new(10.0, 20.0, 60.0, 40.0);
        let lines = hatch_lines(rect, 8.0);
        assert!(!lines.is_empty());
        let grown = rect.inflate(1e-9, 1e-9);
        for (a, b) in lines {
            assert!(grown.contains(a), "{a:?}");
            assert!(grown.contains(b), "{b:?}");
        }
    }

    #[test]
    fn polygon_bounds() {
        let shape = Shape::Polygon(vec![
            Point::new(1.0, 5.0),
            Point::new(-2.0, 3.0),
            Point::new(4.0, -1.0),
        ]);
        assert_eq!(shape.bounding_box(), Rect::new(-2.0, -1.0, 4.0, 5.0));
    }
}
