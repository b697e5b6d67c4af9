//! Cairo-based driver for on-screen, PDF, PNG and SVG output.
//!
//! All four targets share one [`CairoDriver`]; only construction, page
//! breaks and disposal differ. Paint state, transforms and the clip are
//! tracked in a [`StateStack`] and pushed into the Cairo context explicitly
//! instead of through `save`/`restore`, because Cairo would otherwise tie the
//! transform stack to the paint stack.

use super::color::{Color, GRAY, LIGHT_GRAY, RED, WHITE};
use super::driver::{
    Driver, DriverError, ImagePlacement, ImageSource, StateStack, TextDirection,
};
use super::fill::{Fill, GradientAxis, LineStyle};
use super::font::FontDescriptor;
use super::geometry::{ArcStyle, Shape, hatch_lines};
use super::text;
use crate::cache::DecodedImage;
use kurbo::{Affine, Point, Rect};
use std::f64::consts::PI;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Spacing of placeholder hatch lines in user units.
const HATCH_SPACING: f64 = 8.0;

/// Output surface behind a [`CairoDriver`].
enum CairoTarget {
    /// A context owned by the caller, typically a window buffer.
    Interactive,
    Pdf(cairo::PdfSurface),
    Png {
        surface: cairo::ImageSurface,
        path: PathBuf,
    },
    Svg(cairo::SvgSurface),
}

impl CairoTarget {
    fn name(&self) -> &'static str {
        match self {
            CairoTarget::Interactive => "interactive",
            CairoTarget::Pdf(_) => "pdf",
            CairoTarget::Png { .. } => "png",
            CairoTarget::Svg(_) => "svg",
        }
    }
}

/// Driver drawing through a `cairo::Context`.
pub struct CairoDriver {
    ctx: cairo::Context,
    target: CairoTarget,
    state: StateStack,
    disposed: bool,
}

impl std::fmt::Debug for CairoDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CairoDriver")
            .field("target", &self.target.name())
            .field("state", &self.state)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl CairoDriver {
    /// Draws onto a caller-owned context (interactive rendering).
    ///
    /// The context's current matrix becomes the base transform. Any clip
    /// already on the context is replaced by the driver's own clip handling.
    pub fn interactive(ctx: &cairo::Context) -> Result<Self, DriverError> {
        text::ensure_text_engine()?;
        Ok(Self::with_target(ctx.clone(), CairoTarget::Interactive))
    }

    /// Multi-page PDF document; one call to [`Driver::end_page`] per page.
    pub fn pdf(path: impl AsRef<Path>, width: f64, height: f64) -> Result<Self, DriverError> {
        check_size(width, height)?;
        text::ensure_text_engine()?;
        let surface = cairo::PdfSurface::new(width, height, path.as_ref())?;
        let ctx = cairo::Context::new(&surface)?;
        Ok(Self::with_target(ctx, CairoTarget::Pdf(surface)))
    }

    /// Static raster written as PNG on dispose, on a white background.
    pub fn png(path: impl AsRef<Path>, width: i32, height: i32) -> Result<Self, DriverError> {
        check_size(width as f64, height as f64)?;
        text::ensure_text_engine()?;
        let surface = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height)?;
        let ctx = cairo::Context::new(&surface)?;
        ctx.set_source_rgba(WHITE.r, WHITE.g, WHITE.b, WHITE.a);
        ctx.paint()?;
        Ok(Self::with_target(
            ctx,
            CairoTarget::Png {
                surface,
                path: path.as_ref().to_path_buf(),
            },
        ))
    }

    /// SVG document written as the driver draws.
    pub fn svg(path: impl AsRef<Path>, width: f64, height: f64) -> Result<Self, DriverError> {
        check_size(width, height)?;
        text::ensure_text_engine()?;
        let surface = cairo::SvgSurface::new(width, height, Some(path.as_ref()))?;
        let ctx = cairo::Context::new(&surface)?;
        Ok(Self::with_target(ctx, CairoTarget::Svg(surface)))
    }

    fn with_target(ctx: cairo::Context, target: CairoTarget) -> Self {
        let base = from_matrix(ctx.matrix());
        Self {
            ctx,
            target,
            state: StateStack::with_transform(base),
            disposed: false,
        }
    }

    /// The underlying Cairo context.
    pub fn context(&self) -> &cairo::Context {
        &self.ctx
    }

    fn sync_transform(&self) {
        self.ctx.set_matrix(to_matrix(self.state.transform()));
    }

    fn sync_clip(&self) {
        self.ctx.reset_clip();
        if let Some(clip) = self.state.device_clip() {
            self.ctx.set_matrix(cairo::Matrix::identity());
            self.ctx.rectangle(clip.x0, clip.y0, clip.width(), clip.height());
            self.ctx.clip();
            self.sync_transform();
        }
    }

    fn set_source_color(&self, color: Color) {
        self.ctx.set_source_rgba(color.r, color.g, color.b, color.a);
    }

    fn apply_stroke(&self) {
        let paint = self.state.paint();
        self.set_source_color(paint.line_color);
        self.ctx.set_line_width(paint.line_thickness);
        self.ctx.set_line_join(cairo::LineJoin::Miter);
        self.ctx.set_dash(&paint.line_style.dash_pattern(paint.line_thickness), 0.0);
    }

    /// Adds the outline of `shape` to the current path.
    fn build_path(&self, shape: &Shape) {
        let ctx = &self.ctx;
        ctx.new_path();
        match shape {
            Shape::Line { from, to } => {
                ctx.move_to(from.x, from.y);
                ctx.line_to(to.x, to.y);
            }
            Shape::Rect(r) => {
                let r = r.abs();
                ctx.rectangle(r.x0, r.y0, r.width(), r.height());
            }
            Shape::Oval(r) => {
                self.unit_circle_path(*r, |ctx| {
                    ctx.new_sub_path();
                    ctx.arc(0.0, 0.0, 1.0, 0.0, 2.0 * PI);
                    ctx.close_path();
                });
            }
            Shape::Arc {
                bounds,
                start,
                extent,
                style,
            } => {
                // Counter-clockwise degrees in a y-down space are negative Cairo angles.
                let a0 = -start.to_radians();
                let a1 = -(start + extent).to_radians();
                let style = *style;
                let extent = *extent;
                self.unit_circle_path(*bounds, |ctx| {
                    if style == ArcStyle::Pie {
                        ctx.move_to(0.0, 0.0);
                    } else {
                        ctx.new_sub_path();
                    }
                    if extent >= 0.0 {
                        ctx.arc_negative(0.0, 0.0, 1.0, a0, a1);
                    } else {
                        ctx.arc(0.0, 0.0, 1.0, a0, a1);
                    }
                    if style != ArcStyle::Open {
                        ctx.close_path();
                    }
                });
            }
            Shape::Polygon(points) => {
                if let Some((first, rest)) = points.split_first() {
                    ctx.move_to(first.x, first.y);
                    for p in rest {
                        ctx.line_to(p.x, p.y);
                    }
                    ctx.close_path();
                }
            }
            Shape::Point(p) => {
                let size = self.state.paint().line_thickness.max(1.0);
                ctx.rectangle(p.x - size / 2.0, p.y - size / 2.0, size, size);
            }
        }
    }

    /// Builds a path in the unit-circle space of the ellipse inscribed in `bounds`.
    fn unit_circle_path(&self, bounds: Rect, build: impl FnOnce(&cairo::Context)) {
        let b = bounds.abs();
        if b.width() <= 0.0 || b.height() <= 0.0 {
            return;
        }
        let center = b.center();
        self.ctx.save().ok();
        self.ctx.translate(center.x, center.y);
        self.ctx.scale(b.width() / 2.0, b.height() / 2.0);
        build(&self.ctx);
        self.ctx.restore().ok();
    }

    /// Sets the source for one fill layer over `bounds`.
    fn set_fill_source(&self, layer: &Fill, bounds: Rect) -> bool {
        match layer {
            Fill::Color(c) => {
                self.set_source_color(*c);
                true
            }
            Fill::Gradient { start, end, axis } => {
                let (x1, y1) = match axis {
                    GradientAxis::Horizontal => (bounds.x1, bounds.y0),
                    GradientAxis::Vertical => (bounds.x0, bounds.y1),
                };
                let gradient = cairo::LinearGradient::new(bounds.x0, bounds.y0, x1, y1);
                gradient.add_color_stop_rgba(0.0, start.r, start.g, start.b, start.a);
                gradient.add_color_stop_rgba(1.0, end.r, end.g, end.b, end.a);
                self.ctx.set_source(&gradient).is_ok()
            }
            Fill::Texture(image) => match image_surface(image) {
                Ok(surface) => {
                    let pattern = cairo::SurfacePattern::create(&surface);
                    pattern.set_extend(cairo::Extend::Repeat);
                    self.ctx.set_source(&pattern).is_ok()
                }
                Err(err) => {
                    log::warn!("Skipping texture fill: {}", err);
                    false
                }
            },
            Fill::Composite(_) => false,
        }
    }

    fn draw_placeholder(&mut self, rect: Rect, missing: bool) {
        let ctx = &self.ctx;
        self.sync_transform();
        ctx.new_path();
        ctx.rectangle(rect.x0, rect.y0, rect.width(), rect.height());
        self.set_source_color(LIGHT_GRAY);
        let _ = ctx.fill();

        ctx.set_line_width(1.0);
        ctx.set_dash(&[], 0.0);
        self.set_source_color(GRAY);
        for (a, b) in hatch_lines(rect, HATCH_SPACING) {
            ctx.move_to(a.x, a.y);
            ctx.line_to(b.x, b.y);
        }
        let _ = ctx.stroke();

        if missing {
            self.set_source_color(RED);
            ctx.set_line_width(2.0);
            ctx.move_to(rect.x0, rect.y0);
            ctx.line_to(rect.x1, rect.y1);
            ctx.move_to(rect.x1, rect.y0);
            ctx.line_to(rect.x0, rect.y1);
            ctx.rectangle(rect.x0, rect.y0, rect.width(), rect.height());
            let _ = ctx.stroke();
        }
    }

    fn paint_bitmap(&mut self, image: &DecodedImage, dest: Rect) -> Result<(), DriverError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DriverError::Encode("empty bitmap".to_string()));
        }
        let surface = image_surface(image)?;
        let (w, h) = image.size();
        self.sync_transform();
        let ctx = &self.ctx;
        ctx.save()?;
        ctx.translate(dest.x0, dest.y0);
        ctx.scale(dest.width() / w, dest.height() / h);
        ctx.set_source_surface(&surface, 0.0, 0.0)?;
        ctx.source().set_filter(cairo::Filter::Good);
        let result = ctx.paint();
        ctx.restore()?;
        result?;
        Ok(())
    }
}

fn check_size(width: f64, height: f64) -> Result<(), DriverError> {
    if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
        Ok(())
    } else {
        Err(DriverError::InvalidSize { width, height })
    }
}

fn to_matrix(affine: Affine) -> cairo::Matrix {
    let [xx, yx, xy, yy, x0, y0] = affine.as_coeffs();
    cairo::Matrix::new(xx, yx, xy, yy, x0, y0)
}

fn from_matrix(matrix: cairo::Matrix) -> Affine {
    Affine::new([
        matrix.xx(),
        matrix.yx(),
        matrix.xy(),
        matrix.yy(),
        matrix.x0(),
        matrix.y0(),
    ])
}

/// Copies an RGBA bitmap into a premultiplied ARGB32 Cairo surface.
pub fn image_surface(image: &DecodedImage) -> Result<cairo::ImageSurface, DriverError> {
    let mut surface = cairo::ImageSurface::create(
        cairo::Format::ARgb32,
        image.width() as i32,
        image.height() as i32,
    )?;
    let stride = surface.stride() as usize;
    {
        let mut data = surface
            .data()
            .map_err(|e| DriverError::Encode(e.to_string()))?;
        for (y, row) in image.pixels().rows().enumerate() {
            for (x, px) in row.enumerate() {
                let [r, g, b, a] = px.0;
                let premultiply = |c: u8| ((c as u32 * a as u32 + 127) / 255) as u8;
                let argb = (a as u32) << 24
                    | (premultiply(r) as u32) << 16
                    | (premultiply(g) as u32) << 8
                    | premultiply(b) as u32;
                let offset = y * stride + x * 4;
                data[offset..offset + 4].copy_from_slice(&argb.to_ne_bytes());
            }
        }
    }
    surface.mark_dirty();
    Ok(surface)
}

impl Driver for CairoDriver {
    fn draw(&mut self, shape: &Shape) {
        self.sync_transform();
        self.build_path(shape);
        if matches!(shape, Shape::Point(_)) {
            self.set_source_color(self.state.paint().line_color);
            let _ = self.ctx.fill();
            return;
        }
        self.apply_stroke();
        let _ = self.ctx.stroke();
    }

    fn fill(&mut self, shape: &Shape) {
        if matches!(shape, Shape::Line { .. }) {
            return;
        }
        let fill = self.state.paint().fill.clone();
        if fill.is_invisible() {
            return;
        }
        self.sync_transform();
        self.build_path(shape);
        let bounds = shape.bounding_box();
        fill.for_each_layer(&mut |layer| {
            if self.set_fill_source(layer, bounds) {
                let _ = self.ctx.fill_preserve();
            }
        });
        self.ctx.new_path();
    }

    fn draw_text(&mut self, origin: Point, text: &str, font: &FontDescriptor, direction: TextDirection) {
        if text.is_empty() {
            return;
        }
        self.sync_transform();
        let ctx = &self.ctx;
        ctx.save().ok();
        ctx.translate(origin.x, origin.y);
        if direction == TextDirection::Vertical {
            ctx.rotate(-PI / 2.0);
        }
        let layout = pangocairo::functions::create_layout(ctx);
        let baseline = text::prepare_layout(&layout, font, text);
        self.set_source_color(self.state.paint().line_color);
        ctx.move_to(0.0, -baseline);
        pangocairo::functions::show_layout(ctx, &layout);
        ctx.restore().ok();
    }

    fn draw_image(&mut self, image: ImageSource<'_>, placement: ImagePlacement) {
        match image {
            ImageSource::Ready(bitmap) => {
                let dest = placement.resolve(Some(bitmap.size()));
                if let Err(err) = self.paint_bitmap(bitmap, dest) {
                    log::warn!("Failed to draw image, using placeholder: {}", err);
                    self.draw_placeholder(dest, true);
                }
            }
            ImageSource::Loading => {
                let dest = placement.resolve(None);
                self.draw_placeholder(dest, false);
            }
            ImageSource::Missing => {
                let dest = placement.resolve(None);
                self.draw_placeholder(dest, true);
            }
        }
    }

    fn string_bounds(&self, font: &FontDescriptor, text: &str) -> Rect {
        let layout = pangocairo::functions::create_layout(&self.ctx);
        text::layout_bounds(&layout, font, text)
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
        self.state.paint_mut().line_thickness = thickness.max(0.0);
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
        if self.state.pop() {
            self.sync_clip();
        }
    }

    fn push_transform(&mut self, transform: Affine) {
        self.state.push_transform(transform);
        self.sync_transform();
    }

    fn pop_transform(&mut self) {
        if self.state.pop_transform() {
            self.sync_transform();
        }
    }

    fn transform(&self) -> Affine {
        self.state.transform()
    }

    fn clip(&self) -> Option<Rect> {
        self.state.user_clip()
    }

    fn set_clip(&mut self, rect: Rect) {
        self.state.intersect_clip(rect);
        self.sync_clip();
    }

    fn end_page(&mut self) {
        if let CairoTarget::Pdf(_) = self.target {
            if let Err(err) = self.ctx.show_page() {
                log::warn!("Failed to finish PDF page: {}", err);
            }
        }
    }

    fn dispose(&mut self) -> Result<(), DriverError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.state.warn_unbalanced(self.target.name());

        match &self.target {
            CairoTarget::Interactive => {}
            CairoTarget::Pdf(surface) => {
                surface.flush();
                surface.finish();
                surface.status()?;
            }
            CairoTarget::Png { surface, path } => {
                surface.flush();
                let mut file = File::create(path)?;
                surface
                    .write_to_png(&mut file)
                    .map_err(|e| DriverError::Encode(e.to_string()))?;
                log::info!("Wrote {}", path.display());
            }
            CairoTarget::Svg(surface) => {
                surface.flush();
                surface.finish();
                surface.status()?;
            }
        }
        Ok(())
    }
}

impl Drop for CairoDriver {
    fn drop(&mut self) {
        if !self.disposed {
            if let Err(err) = self.dispose() {
                log::error!("Failed to finish {} output: {}", self.target.name(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ImageOrientation;
    use crate::draw::color::BLUE;
    use image::{Rgba, RgbaImage};

    fn surface_with_context(width: i32, height: i32) -> (cairo::ImageSurface, cairo::Context) {
        let surface = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height).unwrap();
        let ctx = cairo::Context::new(&surface).unwrap();
        (surface, ctx)
    }

    fn pixel(surface: &mut cairo::ImageSurface, x: usize, y: usize) -> [u8; 4] {
        let stride = surface.stride() as usize;
        let data = surface.data().unwrap();
        let offset = y * stride + x * 4;
        let v = u32::from_ne_bytes(data[offset..offset + 4].try_into().unwrap());
        [(v >> 16) as u8, (v >> 8) as u8, v as u8, (v >> 24) as u8]
    }

    #[test]
    fn fill_rect_paints_pixels_inside_only() {
        let (mut surface, ctx) = surface_with_context(40, 40);
        let mut driver = CairoDriver::interactive(&ctx).unwrap();
        driver.set_fill(Fill::Color(BLUE));
        driver.fill(&Shape::Rect(Rect::new(10.0, 10.0, 20.0, 20.0)));
        driver.dispose().unwrap();
        drop(driver);
        drop(ctx);
        assert_eq!(pixel(&mut surface, 15, 15), [0, 0, 255, 255]);
        assert_eq!(pixel(&mut surface, 5, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn clip_limits_drawing_and_pops_with_state() {
        let (mut surface, ctx) = surface_with_context(40, 40);
        let mut driver = CairoDriver::interactive(&ctx).unwrap();
        driver.set_fill(Fill::Color(BLUE));
        driver.push_state();
        driver.set_clip(Rect::new(0.0, 0.0, 10.0, 40.0));
        driver.fill(&Shape::Rect(Rect::new(0.0, 0.0, 40.0, 20.0)));
        driver.pop_state();
        assert_eq!(driver.clip(), None);
        driver.fill(&Shape::Rect(Rect::new(0.0, 30.0, 40.0, 40.0)));
        drop(driver);
        drop(ctx);
        assert_eq!(pixel(&mut surface, 5, 5)[3], 255);
        assert_eq!(pixel(&mut surface, 25, 5)[3], 0);
        assert_eq!(pixel(&mut surface, 25, 35)[3], 255);
    }

    #[test]
    fn transform_stack_is_independent_of_state_stack() {
        let (_surface, ctx) = surface_with_context(10, 10);
        let mut driver = CairoDriver::interactive(&ctx).unwrap();
        driver.push_transform(Affine::translate((5.0, 0.0)));
        driver.push_state();
        driver.pop_state();
        assert_eq!(driver.transform(), Affine::translate((5.0, 0.0)));
        driver.pop_transform();
        driver.pop_transform();
        assert_eq!(driver.transform(), Affine::IDENTITY);
    }

    #[test]
    fn images_are_scaled_into_their_rect() {
        let (mut surface, ctx) = surface_with_context(20, 20);
        let mut driver = CairoDriver::interactive(&ctx).unwrap();
        let bitmap = std::sync::Arc::new(DecodedImage::new(
            RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])),
            0,
            ImageOrientation::Vertical,
        ));
        driver.draw_image(
            ImageSource::Ready(&bitmap),
            ImagePlacement::Into(Rect::new(0.0, 0.0, 20.0, 20.0)),
        );
        drop(driver);
        drop(ctx);
        assert_eq!(pixel(&mut surface, 10, 10), [255, 0, 0, 255]);
        assert_eq!(pixel(&mut surface, 19, 19), [255, 0, 0, 255]);
    }

    #[test]
    fn missing_images_paint_a_placeholder() {
        let (mut surface, ctx) = surface_with_context(40, 40);
        let mut driver = CairoDriver::interactive(&ctx).unwrap();
        driver.draw_image(
            ImageSource::Missing,
            ImagePlacement::Into(Rect::new(0.0, 0.0, 40.0, 40.0)),
        );
        drop(driver);
        drop(ctx);
        // Background of the placeholder is opaque light gray.
        assert_eq!(pixel(&mut surface, 20, 3)[3], 255);
    }

    #[test]
    fn invalid_sizes_are_rejected_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let err = CairoDriver::png(dir.path().join("x.png"), 0, 10).unwrap_err();
        assert!(matches!(err, DriverError::InvalidSize { .. }));
    }

    #[test]
    fn png_target_writes_file_on_dispose() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut driver = CairoDriver::png(&path, 16, 16).unwrap();
        driver.fill(&Shape::Oval(Rect::new(0.0, 0.0, 16.0, 16.0)));
        driver.dispose().unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn pdf_target_writes_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let mut driver = CairoDriver::pdf(&path, 200.0, 100.0).unwrap();
        driver.draw(&Shape::Arc {
            bounds: Rect::new(10.0, 10.0, 90.0, 90.0),
            start: 0.0,
            extent: 270.0,
            style: ArcStyle::Pie,
        });
        driver.end_page();
        driver.draw(&Shape::Line {
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 100.0),
        });
        driver.end_page();
        driver.dispose().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
