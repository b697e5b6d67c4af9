//! HTML canvas script output.
//!
//! [`ScriptDriver`] records draw calls as a JavaScript program for a
//! `CanvasRenderingContext2D`. Canvas has no elliptical arc with a
//! separate start angle convention that matches ours under arbitrary
//! transforms, so arcs and ovals are emitted as cubic Bézier paths from
//! [`geometry::arc_path`](super::geometry::arc_path). Bitmaps are embedded as
//! base64 PNG data URLs and loaded before any page is painted.

use super::color::{Color, GRAY, LIGHT_GRAY, RED};
use super::driver::{
    Driver, DriverError, ImagePlacement, ImageSource, StateStack, TextDirection,
};
use super::fill::{Fill, GradientAxis, LineStyle};
use super::font::FontDescriptor;
use super::geometry::{PathOp, Shape, arc_path, hatch_lines, oval_path};
use super::text::TextMeasurer;
use crate::cache::DecodedImage;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kurbo::{Affine, Point, Rect};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HATCH_SPACING: f64 = 8.0;

/// Driver that writes canvas drawing commands.
#[derive(Debug)]
pub struct ScriptDriver {
    width: f64,
    height: f64,
    canvas_id: String,
    state: StateStack,
    measurer: TextMeasurer,
    /// Finished pages.
    pages: Vec<String>,
    /// Commands of the page being drawn.
    current: String,
    /// Data URLs referenced as `img[i]`.
    images: Vec<String>,
    /// Bitmaps already in `images`, with their index.
    encoded: Vec<(Arc<DecodedImage>, usize)>,
    output: Option<PathBuf>,
    disposed: bool,
}

impl ScriptDriver {
    /// In-memory script for a canvas of the given size; read it back with
    /// [`ScriptDriver::script`].
    pub fn new(width: f64, height: f64) -> Result<Self, DriverError> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(DriverError::InvalidSize { width, height });
        }
        let measurer = TextMeasurer::new()?;
        Ok(Self {
            width,
            height,
            canvas_id: "corescope".to_string(),
            state: StateStack::new(),
            measurer,
            pages: Vec::new(),
            current: String::new(),
            images: Vec::new(),
            encoded: Vec::new(),
            output: None,
            disposed: false,
        })
    }

    /// Script written to `path` on dispose.
    pub fn to_file(path: impl AsRef<Path>, width: f64, height: f64) -> Result<Self, DriverError> {
        let mut driver = Self::new(width, height)?;
        driver.output = Some(path.as_ref().to_path_buf());
        Ok(driver)
    }

    /// Id of the `<canvas>` element the script draws into.
    pub fn with_canvas_id(mut self, id: impl Into<String>) -> Self {
        self.canvas_id = id.into();
        self
    }

    /// Number of pages recorded so far, counting the one in progress.
    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(!self.current.is_empty() || self.pages.is_empty())
    }

    /// The complete program for everything drawn so far.
    pub fn script(&self) -> String {
        let mut pages = self.pages.clone();
        if !self.current.is_empty() || pages.is_empty() {
            pages.push(self.current.clone());
        }

        let mut out = String::new();
        let _ = writeln!(out, "(function () {{");
        let _ = writeln!(
            out,
            "  const canvas = document.getElementById({});",
            js_string(&self.canvas_id)
        );
        let _ = writeln!(out, "  canvas.width = {};", num(self.width));
        let _ = writeln!(out, "  canvas.height = {};", num(self.height));
        let _ = writeln!(out, "  const ctx = canvas.getContext(\"2d\");");
        let _ = writeln!(out, "  const sources = [");
        for src in &self.images {
            let _ = writeln!(out, "    {},", js_string(src));
        }
        let _ = writeln!(out, "  ];");
        let _ = writeln!(out, "  const pages = [");
        for page in &pages {
            let _ = writeln!(out, "    function (ctx, img) {{");
            let _ = writeln!(out, "      ctx.save();");
            out.push_str(page);
            let _ = writeln!(out, "      ctx.restore();");
            let _ = writeln!(out, "    }},");
        }
        let _ = writeln!(out, "  ];");
        out.push_str(
            "  const img = sources.map(function (src) {\n\
             \x20   const image = new Image();\n\
             \x20   image.src = src;\n\
             \x20   return image;\n\
             \x20 });\n\
             \x20 Promise.all(img.map(function (image) { return image.decode(); })).then(function () {\n\
             \x20   const page = Number(canvas.dataset.page || 0);\n\
             \x20   pages[Math.min(page, pages.length - 1)](ctx, img);\n\
             \x20 });\n",
        );
        let _ = writeln!(out, "}})();");
        out
    }

    fn emit(&mut self, line: impl AsRef<str>) {
        self.current.push_str("      ");
        self.current.push_str(line.as_ref());
        self.current.push('\n');
    }

    /// Sets the canvas transform to the current user-to-device transform.
    fn emit_transform(&mut self) {
        let [a, b, c, d, e, f] = self.state.transform().as_coeffs();
        self.emit(format!(
            "ctx.setTransform({}, {}, {}, {}, {}, {});",
            num(a),
            num(b),
            num(c),
            num(d),
            num(e),
            num(f)
        ));
    }

    /// Canvas clips can only be undone by `restore`, so each clip change
    /// restores the page's base state and re-applies the device clip.
    fn emit_clip(&mut self) {
        self.emit("ctx.restore();");
        self.emit("ctx.save();");
        if let Some(clip) = self.state.device_clip() {
            self.emit("ctx.setTransform(1, 0, 0, 1, 0, 0);");
            self.emit("ctx.beginPath();");
            self.emit(format!(
                "ctx.rect({}, {}, {}, {});",
                num(clip.x0),
                num(clip.y0),
                num(clip.width()),
                num(clip.height())
            ));
            self.emit("ctx.clip();");
        }
    }

    fn emit_path_ops(&mut self, ops: &[PathOp]) {
        for op in ops {
            let line = match op {
                PathOp::MoveTo(p) => format!("ctx.moveTo({}, {});", num(p.x), num(p.y)),
                PathOp::LineTo(p) => format!("ctx.lineTo({}, {});", num(p.x), num(p.y)),
                PathOp::CurveTo(a, b, c) => format!(
                    "ctx.bezierCurveTo({}, {}, {}, {}, {}, {});",
                    num(a.x),
                    num(a.y),
                    num(b.x),
                    num(b.y),
                    num(c.x),
                    num(c.y)
                ),
                PathOp::Close => "ctx.closePath();".to_string(),
            };
            self.emit(line);
        }
    }

    /// Emits `beginPath` followed by the outline of `shape`.
    fn emit_shape_path(&mut self, shape: &Shape) {
        self.emit("ctx.beginPath();");
        match shape {
            Shape::Line { from, to } => {
                self.emit_path_ops(&[PathOp::MoveTo(*from), PathOp::LineTo(*to)]);
            }
            Shape::Rect(r) => {
                let r = r.abs();
                self.emit(format!(
                    "ctx.rect({}, {}, {}, {});",
                    num(r.x0),
                    num(r.y0),
                    num(r.width()),
                    num(r.height())
                ));
            }
            Shape::Oval(r) => {
                let ops = oval_path(*r, self.state.transform());
                self.emit_path_ops(&ops);
            }
            Shape::Arc {
                bounds,
                start,
                extent,
                style,
            } => {
                let ops = arc_path(*bounds, *start, *extent, *style, self.state.transform());
                self.emit_path_ops(&ops);
            }
            Shape::Polygon(points) => {
                if let Some((first, rest)) = points.split_first() {
                    let mut ops = vec![PathOp::MoveTo(*first)];
                    ops.extend(rest.iter().map(|p| PathOp::LineTo(*p)));
                    ops.push(PathOp::Close);
                    self.emit_path_ops(&ops);
                }
            }
            Shape::Point(p) => {
                let size = self.state.paint().line_thickness.max(1.0);
                self.emit(format!(
                    "ctx.rect({}, {}, {}, {});",
                    num(p.x - size / 2.0),
                    num(p.y - size / 2.0),
                    num(size),
                    num(size)
                ));
            }
        }
    }

    fn emit_stroke_style(&mut self) {
        let paint = self.state.paint().clone();
        self.emit(format!("ctx.strokeStyle = {};", js_string(&paint.line_color.to_css())));
        self.emit(format!("ctx.lineWidth = {};", num(paint.line_thickness)));
        let dashes: Vec<String> = paint
            .line_style
            .dash_pattern(paint.line_thickness)
            .into_iter()
            .map(num)
            .collect();
        self.emit(format!("ctx.setLineDash([{}]);", dashes.join(", ")));
    }

    fn register_image(&mut self, image: &Arc<DecodedImage>) -> Option<usize> {
        if let Some((_, index)) = self.encoded.iter().find(|(seen, _)| Arc::ptr_eq(seen, image)) {
            return Some(*index);
        }
        match image.to_png() {
            Ok(bytes) => {
                let url = format!("data:image/png;base64,{}", STANDARD.encode(bytes));
                self.images.push(url);
                let index = self.images.len() - 1;
                self.encoded.push((image.clone(), index));
                Some(index)
            }
            Err(err) => {
                log::warn!("Failed to encode image for script output: {}", err);
                None
            }
        }
    }

    fn emit_fill_layer(&mut self, layer: &Fill, bounds: Rect) {
        match layer {
            Fill::Color(c) => {
                self.emit(format!("ctx.fillStyle = {};", js_string(&c.to_css())));
            }
            Fill::Gradient { start, end, axis } => {
                let (x1, y1) = match axis {
                    GradientAxis::Horizontal => (bounds.x1, bounds.y0),
                    GradientAxis::Vertical => (bounds.x0, bounds.y1),
                };
                self.emit(format!(
                    "var g = ctx.createLinearGradient({}, {}, {}, {});",
                    num(bounds.x0),
                    num(bounds.y0),
                    num(x1),
                    num(y1)
                ));
                self.emit(format!("g.addColorStop(0, {});", js_string(&start.to_css())));
                self.emit(format!("g.addColorStop(1, {});", js_string(&end.to_css())));
                self.emit("ctx.fillStyle = g;");
            }
            Fill::Texture(image) => {
                let Some(index) = self.register_image(image) else {
                    return;
                };
                self.emit(format!(
                    "ctx.fillStyle = ctx.createPattern(img[{}], \"repeat\");",
                    index
                ));
            }
            Fill::Composite(_) => return,
        }
        self.emit("ctx.fill();");
    }

    fn emit_placeholder(&mut self, rect: Rect, missing: bool) {
        self.emit_transform();
        self.emit(format!("ctx.fillStyle = {};", js_string(&LIGHT_GRAY.to_css())));
        self.emit(format!(
            "ctx.fillRect({}, {}, {}, {});",
            num(rect.x0),
            num(rect.y0),
            num(rect.width()),
            num(rect.height())
        ));
        self.emit("ctx.setLineDash([]);");
        self.emit("ctx.lineWidth = 1;");
        self.emit(format!("ctx.strokeStyle = {};", js_string(&GRAY.to_css())));
        self.emit("ctx.beginPath();");
        let ops: Vec<PathOp> = hatch_lines(rect, HATCH_SPACING)
            .into_iter()
            .flat_map(|(a, b)| [PathOp::MoveTo(a), PathOp::LineTo(b)])
            .collect();
        self.emit_path_ops(&ops);
        self.emit("ctx.stroke();");
        if missing {
            self.emit(format!("ctx.strokeStyle = {};", js_string(&RED.to_css())));
            self.emit("ctx.lineWidth = 2;");
            self.emit("ctx.beginPath();");
            self.emit_path_ops(&[
                PathOp::MoveTo(Point::new(rect.x0, rect.y0)),
                PathOp::LineTo(Point::new(rect.x1, rect.y1)),
                PathOp::MoveTo(Point::new(rect.x1, rect.y0)),
                PathOp::LineTo(Point::new(rect.x0, rect.y1)),
            ]);
            self.emit(format!(
                "ctx.rect({}, {}, {}, {});",
                num(rect.x0),
                num(rect.y0),
                num(rect.width()),
                num(rect.height())
            ));
            self.emit("ctx.stroke();");
        }
    }
}

/// Compact decimal form for coordinates.
fn num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" || text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// JSON string literals are valid JavaScript string literals.
fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

impl Driver for ScriptDriver {
    fn draw(&mut self, shape: &Shape) {
        self.emit_transform();
        self.emit_shape_path(shape);
        if matches!(shape, Shape::Point(_)) {
            let color = self.state.paint().line_color.to_css();
            self.emit(format!("ctx.fillStyle = {};", js_string(&color)));
            self.emit("ctx.fill();");
            return;
        }
        self.emit_stroke_style();
        self.emit("ctx.stroke();");
    }

    fn fill(&mut self, shape: &Shape) {
        if matches!(shape, Shape::Line { .. }) {
            return;
        }
        let fill = self.state.paint().fill.clone();
        if fill.is_invisible() {
            return;
        }
        self.emit_transform();
        self.emit_shape_path(shape);
        let bounds = shape.bounding_box();
        let mut layers = Vec::new();
        fill.for_each_layer(&mut |layer| layers.push(layer.clone()));
        for layer in &layers {
            self.emit_fill_layer(layer, bounds);
        }
    }

    fn draw_text(&mut self, origin: Point, text: &str, font: &FontDescriptor, direction: TextDirection) {
        if text.is_empty() {
            return;
        }
        self.emit_transform();
        self.emit(format!("ctx.font = {};", js_string(&font.to_css())));
        let color = self.state.paint().line_color.to_css();
        self.emit(format!("ctx.fillStyle = {};", js_string(&color)));
        self.emit("ctx.textBaseline = \"alphabetic\";");
        match direction {
            TextDirection::Horizontal => {
                self.emit(format!(
                    "ctx.fillText({}, {}, {});",
                    js_string(text),
                    num(origin.x),
                    num(origin.y)
                ));
            }
            TextDirection::Vertical => {
                self.emit(format!("ctx.translate({}, {});", num(origin.x), num(origin.y)));
                self.emit("ctx.rotate(-Math.PI / 2);");
                self.emit(format!("ctx.fillText({}, 0, 0);", js_string(text)));
            }
        }
    }

    fn draw_image(&mut self, image: ImageSource<'_>, placement: ImagePlacement) {
        match image {
            ImageSource::Ready(bitmap) => {
                let dest = placement.resolve(Some(bitmap.size()));
                match self.register_image(bitmap) {
                    Some(index) => {
                        self.emit_transform();
                        self.emit(format!(
                            "ctx.drawImage(img[{}], {}, {}, {}, {});",
                            index,
                            num(dest.x0),
                            num(dest.y0),
                            num(dest.width()),
                            num(dest.height())
                        ));
                    }
                    None => self.emit_placeholder(dest, true),
                }
            }
            ImageSource::Loading => self.emit_placeholder(placement.resolve(None), false),
            ImageSource::Missing => self.emit_placeholder(placement.resolve(None), true),
        }
    }

    fn string_bounds(&self, font: &FontDescriptor, text: &str) -> Rect {
        self.measurer.string_bounds(font, text)
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
        let before = self.state.device_clip();
        if self.state.pop() && before != self.state.device_clip() {
            self.emit_clip();
        }
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
        self.emit_clip();
    }

    fn end_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        // The next page starts from the same clip.
        if self.state.device_clip().is_some() {
            self.emit_clip();
        }
    }

    fn dispose(&mut self) -> Result<(), DriverError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.state.warn_unbalanced("script");
        if let Some(path) = &self.output {
            std::fs::write(path, self.script())?;
            log::info!("Wrote {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ImageOrientation;
    use crate::draw::color::BLUE;
    use crate::draw::geometry::ArcStyle;
    use image::{Rgba, RgbaImage};

    fn driver() -> ScriptDriver {
        ScriptDriver::new(200.0, 100.0).unwrap()
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(1.25), "1.25");
        assert_eq!(num(-0.0001), "0");
        assert_eq!(num(f64::NAN), "0");
    }

    #[test]
    fn arcs_become_bezier_curves() {
        let mut d = driver();
        d.draw(&Shape::Arc {
            bounds: Rect::new(0.0, 0.0, 100.0, 50.0),
            start: 0.0,
            extent: 180.0,
            style: ArcStyle::Open,
        });
        let script = d.script();
        assert!(script.contains("bezierCurveTo"));
        assert!(!script.contains("ctx.arc("));
        assert!(!script.contains("closePath"));
    }

    #[test]
    fn composite_fill_emits_one_fill_per_layer() {
        let mut d = driver();
        d.set_fill(Fill::Composite(vec![
            Fill::Color(BLUE),
            Fill::gradient(RED, BLUE, GradientAxis::Vertical),
        ]));
        d.fill(&Shape::Rect(Rect::new(10.0, 20.0, 30.0, 60.0)));
        let script = d.script();
        assert_eq!(script.matches("ctx.fill();").count(), 2);
        // Gradient spans the rectangle's bounding box vertically.
        assert!(script.contains("createLinearGradient(10, 20, 10, 60)"));
    }

    #[test]
    fn text_is_escaped() {
        let mut d = driver();
        d.draw_text(
            Point::new(5.0, 10.0),
            "say \"hi\"</script>",
            &FontDescriptor::default(),
            TextDirection::Vertical,
        );
        let script = d.script();
        assert!(script.contains(r#"ctx.fillText("say \"hi\"</script>", 0, 0);"#));
        assert!(script.contains("ctx.rotate(-Math.PI / 2);"));
    }

    #[test]
    fn images_are_embedded_as_data_urls() {
        let mut d = driver();
        let bitmap = Arc::new(DecodedImage::new(
            RgbaImage::from_pixel(3, 2, Rgba([0, 128, 0, 255])),
            0,
            ImageOrientation::Vertical,
        ));
        d.draw_image(ImageSource::Ready(&bitmap), ImagePlacement::At(Point::new(1.0, 2.0)));
        let script = d.script();
        assert!(script.contains("data:image/png;base64,"));
        assert!(script.contains("ctx.drawImage(img[0], 1, 2, 3, 2);"));
    }

    #[test]
    fn repeated_bitmaps_are_embedded_once() {
        let mut d = driver();
        let bitmap = Arc::new(DecodedImage::new(
            RgbaImage::from_pixel(3, 2, Rgba([0, 128, 0, 255])),
            0,
            ImageOrientation::Vertical,
        ));
        let other = Arc::new(DecodedImage::new(
            RgbaImage::from_pixel(2, 2, Rgba([0, 0, 128, 255])),
            0,
            ImageOrientation::Vertical,
        ));
        d.draw_image(ImageSource::Ready(&bitmap), ImagePlacement::At(Point::new(0.0, 0.0)));
        d.draw_image(ImageSource::Ready(&bitmap), ImagePlacement::At(Point::new(0.0, 10.0)));
        d.draw_image(ImageSource::Ready(&other), ImagePlacement::At(Point::new(0.0, 20.0)));
        let script = d.script();
        assert_eq!(script.matches("data:image/png;base64,").count(), 2);
        assert!(script.contains("ctx.drawImage(img[0], 0, 10, 3, 2);"));
        assert!(script.contains("ctx.drawImage(img[1], 0, 20, 2, 2);"));
    }

    #[test]
    fn loading_placeholder_has_no_cross() {
        let mut d = driver();
        d.draw_image(ImageSource::Loading, ImagePlacement::Into(Rect::new(0.0, 0.0, 40.0, 40.0)));
        let loading = d.script();
        let mut d = driver();
        d.draw_image(ImageSource::Missing, ImagePlacement::Into(Rect::new(0.0, 0.0, 40.0, 40.0)));
        let missing = d.script();
        assert!(!loading.contains(&RED.to_css()));
        assert!(missing.contains(&RED.to_css()));
    }

    #[test]
    fn clip_is_reapplied_after_pop() {
        let mut d = driver();
        d.push_state();
        d.set_clip(Rect::new(0.0, 0.0, 50.0, 50.0));
        d.pop_state();
        let script = d.script();
        assert_eq!(script.matches("ctx.clip();").count(), 1);
        // Popping back to an unclipped state restores the base state.
        assert_eq!(script.matches("ctx.restore();").count(), 3);
    }

    #[test]
    fn pages_are_separate_functions() {
        let mut d = driver();
        d.draw(&Shape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        d.end_page();
        d.draw(&Shape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(d.page_count(), 2);
        assert_eq!(d.script().matches("function (ctx, img)").count(), 2);
    }

    #[test]
    fn dispose_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.js");
        let mut d = ScriptDriver::to_file(&path, 10.0, 10.0).unwrap();
        d.draw(&Shape::Line {
            from: Point::ORIGIN,
            to: Point::new(10.0, 10.0),
        });
        d.dispose().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("getElementById(\"corescope\")"));
    }
}
