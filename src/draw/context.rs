//! Convenience façade over a [`Driver`].
//!
//! Call sites describe what they want in plain numbers and rectangles; the
//! context builds the shapes, measures text and images, and forwards to the
//! driver. Images referenced by URL are resolved through an optional
//! [`ImageLoader`].

use super::color::Color;
use super::driver::{Driver, ImagePlacement, ImageSource, TextDirection};
use super::fill::{Fill, LineStyle};
use super::font::FontDescriptor;
use super::geometry::{ArcStyle, Shape};
use crate::cache::{DecodedImage, ImageCache, ImageOrientation, MAX_LEVEL, RepaintHandle};
use kurbo::{Affine, Point, Rect};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Where a context gets images it only knows by URL.
#[derive(Clone)]
pub struct ImageLoader {
    cache: Arc<ImageCache>,
    repaint: Option<RepaintHandle>,
}

impl ImageLoader {
    /// Waits for every image; for files and print output.
    pub fn blocking(cache: Arc<ImageCache>) -> Self {
        Self {
            cache,
            repaint: None,
        }
    }

    /// Never waits; `repaint` runs when a missing image becomes available.
    pub fn interactive(cache: Arc<ImageCache>, repaint: RepaintHandle) -> Self {
        Self {
            cache,
            repaint: Some(repaint),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.repaint.is_some()
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }
}

/// Horizontal placement of text inside a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Drawing façade handed to tracks while a scene renders.
pub struct GraphicsContext<'a> {
    driver: &'a mut dyn Driver,
    loader: Option<ImageLoader>,
}

impl<'a> GraphicsContext<'a> {
    pub fn new(driver: &'a mut dyn Driver) -> Self {
        Self {
            driver,
            loader: None,
        }
    }

    pub fn with_loader(driver: &'a mut dyn Driver, loader: ImageLoader) -> Self {
        Self {
            driver,
            loader: Some(loader),
        }
    }

    pub fn loader(&self) -> Option<&ImageLoader> {
        self.loader.as_ref()
    }

    /// The wrapped driver.
    pub fn driver(&mut self) -> &mut dyn Driver {
        &mut *self.driver
    }

    // Shapes

    pub fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.driver.draw(&Shape::Line {
            from: Point::new(x1, y1),
            to: Point::new(x2, y2),
        });
    }

    pub fn draw_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.driver.draw(&Shape::Rect(Rect::new(x, y, x + w, y + h)));
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.driver.fill(&Shape::Rect(Rect::new(x, y, x + w, y + h)));
    }

    pub fn draw_oval(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.driver.draw(&Shape::Oval(Rect::new(x, y, x + w, y + h)));
    }

    pub fn fill_oval(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.driver.fill(&Shape::Oval(Rect::new(x, y, x + w, y + h)));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_arc(&mut self, x: f64, y: f64, w: f64, h: f64, start: f64, extent: f64, style: ArcStyle) {
        self.driver.draw(&Shape::Arc {
            bounds: Rect::new(x, y, x + w, y + h),
            start,
            extent,
            style,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fill_arc(&mut self, x: f64, y: f64, w: f64, h: f64, start: f64, extent: f64, style: ArcStyle) {
        self.driver.fill(&Shape::Arc {
            bounds: Rect::new(x, y, x + w, y + h),
            start,
            extent,
            style,
        });
    }

    pub fn draw_polygon(&mut self, points: &[Point]) {
        if points.len() > 1 {
            self.driver.draw(&Shape::Polygon(points.to_vec()));
        }
    }

    pub fn fill_polygon(&mut self, points: &[Point]) {
        if points.len() > 2 {
            self.driver.fill(&Shape::Polygon(points.to_vec()));
        }
    }

    pub fn draw_point(&mut self, x: f64, y: f64) {
        self.driver.draw(&Shape::Point(Point::new(x, y)));
    }

    /// Strokes the outline of `rect`.
    pub fn stroke_rect(&mut self, rect: Rect) {
        self.driver.draw(&Shape::Rect(rect));
    }

    /// Fills `rect` with the current fill.
    pub fn paint_rect(&mut self, rect: Rect) {
        self.driver.fill(&Shape::Rect(rect));
    }

    // Text

    pub fn string_bounds(&self, font: &FontDescriptor, text: &str) -> Rect {
        self.driver.string_bounds(font, text)
    }

    /// Draws `text` with its baseline starting at `(x, y)`.
    pub fn draw_string(&mut self, x: f64, y: f64, text: &str, font: &FontDescriptor) {
        self.driver
            .draw_text(Point::new(x, y), text, font, TextDirection::Horizontal);
    }

    /// Draws `text` reading bottom to top, baseline starting at `(x, y)`.
    pub fn draw_string_vertical(&mut self, x: f64, y: f64, text: &str, font: &FontDescriptor) {
        self.driver
            .draw_text(Point::new(x, y), text, font, TextDirection::Vertical);
    }

    /// Draws `text` inside `rect`, vertically centered.
    pub fn draw_string_in(&mut self, rect: Rect, text: &str, font: &FontDescriptor, align: TextAlign) {
        let origin = text_origin(rect, self.driver.string_bounds(font, text), align);
        self.driver
            .draw_text(origin, text, font, TextDirection::Horizontal);
    }

    pub fn draw_string_centered(&mut self, rect: Rect, text: &str, font: &FontDescriptor) {
        self.draw_string_in(rect, text, font, TextAlign::Center);
    }

    pub fn draw_string_left(&mut self, rect: Rect, text: &str, font: &FontDescriptor) {
        self.draw_string_in(rect, text, font, TextAlign::Left);
    }

    pub fn draw_string_right(&mut self, rect: Rect, text: &str, font: &FontDescriptor) {
        self.draw_string_in(rect, text, font, TextAlign::Right);
    }

    // Images

    /// Draws a bitmap at its natural size with its top-left corner at `(x, y)`.
    pub fn draw_image(&mut self, image: &Arc<DecodedImage>, x: f64, y: f64) {
        self.driver
            .draw_image(ImageSource::Ready(image), ImagePlacement::At(Point::new(x, y)));
    }

    /// Stretches a bitmap over `rect`.
    pub fn draw_image_into(&mut self, image: &Arc<DecodedImage>, rect: Rect) {
        self.driver
            .draw_image(ImageSource::Ready(image), ImagePlacement::Into(rect));
    }

    /// Fits a bitmap inside `rect`, preserving its aspect ratio, centered.
    pub fn draw_image_centered(&mut self, image: &Arc<DecodedImage>, rect: Rect) {
        let dest = fit_centered(image.size(), rect);
        self.driver
            .draw_image(ImageSource::Ready(image), ImagePlacement::Into(dest));
    }

    /// Draws the image at `url` stretched over `rect`.
    ///
    /// Interactive loaders never block: they draw the best level available
    /// and otherwise a loading placeholder. Blocking loaders wait for the
    /// level that suits `rect` in device pixels. Without a loader, or when
    /// the image cannot be loaded, a missing-image placeholder is drawn.
    pub fn draw_image_url(&mut self, url: &str, orientation: ImageOrientation, rect: Rect) {
        let placement = ImagePlacement::Into(rect);
        let Some(loader) = self.loader.clone() else {
            self.driver.draw_image(ImageSource::Missing, placement);
            return;
        };

        let device = self.driver.transform().transform_rect_bbox(rect.abs());
        let target = (device.width(), device.height());
        let cache = loader.cache();

        match &loader.repaint {
            Some(repaint) => {
                let level = cache
                    .level_for(url, target, orientation, false)
                    .unwrap_or(MAX_LEVEL);
                let handle = cache.get(url, level, orientation, Some(repaint.clone()));
                if let Some(image) = handle.try_get() {
                    self.driver.draw_image(ImageSource::Ready(&image), placement);
                } else if handle.is_failed() {
                    self.driver.draw_image(ImageSource::Missing, placement);
                } else if let Some(image) = cache.closest(url, level, orientation) {
                    self.driver.draw_image(ImageSource::Ready(&image), placement);
                } else {
                    self.driver.draw_image(ImageSource::Loading, placement);
                }
            }
            None => match cache.get_sized(url, target, orientation, None).wait() {
                Some(image) => self.driver.draw_image(ImageSource::Ready(&image), placement),
                None => self.driver.draw_image(ImageSource::Missing, placement),
            },
        }
    }

    // Paint state

    pub fn line_color(&self) -> Color {
        self.driver.line_color()
    }

    pub fn set_line_color(&mut self, color: Color) {
        self.driver.set_line_color(color);
    }

    pub fn line_thickness(&self) -> f64 {
        self.driver.line_thickness()
    }

    pub fn set_line_thickness(&mut self, thickness: f64) {
        self.driver.set_line_thickness(thickness);
    }

    pub fn line_style(&self) -> LineStyle {
        self.driver.line_style()
    }

    pub fn set_line_style(&mut self, style: LineStyle) {
        self.driver.set_line_style(style);
    }

    pub fn fill_style(&self) -> &Fill {
        self.driver.fill_style()
    }

    pub fn set_fill(&mut self, fill: impl Into<Fill>) {
        self.driver.set_fill(fill.into());
    }

    pub fn push_state(&mut self) {
        self.driver.push_state();
    }

    pub fn pop_state(&mut self) {
        self.driver.pop_state();
    }

    /// Runs `f` between a push and a pop of the paint state. The pop also
    /// happens when `f` panics; the panic then continues unwinding.
    pub fn with_state<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.driver.push_state();
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        self.driver.pop_state();
        result.unwrap_or_else(|payload| panic::resume_unwind(payload))
    }

    // Transforms and clip

    pub fn push_transform(&mut self, transform: Affine) {
        self.driver.push_transform(transform);
    }

    pub fn pop_transform(&mut self) {
        self.driver.pop_transform();
    }

    /// Runs `f` with `transform` pushed, popping it afterwards, on panic too.
    pub fn with_transform<R>(&mut self, transform: Affine, f: impl FnOnce(&mut Self) -> R) -> R {
        self.driver.push_transform(transform);
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        self.driver.pop_transform();
        result.unwrap_or_else(|payload| panic::resume_unwind(payload))
    }

    /// Pushes a translation; pop it with [`pop_transform`](Self::pop_transform).
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.driver.push_transform(Affine::translate((dx, dy)));
    }

    /// Pushes a non-uniform scale.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.driver.push_transform(Affine::scale_non_uniform(sx, sy));
    }

    /// Pushes a rotation in degrees, counter-clockwise on screen.
    pub fn rotate(&mut self, degrees: f64) {
        self.driver
            .push_transform(Affine::rotate(-degrees.to_radians()));
    }

    pub fn transform(&self) -> Affine {
        self.driver.transform()
    }

    pub fn clip(&self) -> Option<Rect> {
        self.driver.clip()
    }

    pub fn set_clip(&mut self, rect: Rect) {
        self.driver.set_clip(rect);
    }

    pub fn end_page(&mut self) {
        self.driver.end_page();
    }
}

/// Baseline origin that places text `bounds` inside `rect`.
fn text_origin(rect: Rect, bounds: Rect, align: TextAlign) -> Point {
    let rect = rect.abs();
    let y = rect.center().y - (bounds.y0 + bounds.y1) / 2.0;
    let x = match align {
        TextAlign::Left => rect.x0 - bounds.x0,
        TextAlign::Center => rect.center().x - (bounds.x0 + bounds.x1) / 2.0,
        TextAlign::Right => rect.x1 - bounds.x1,
    };
    Point::new(x, y)
}

/// Largest rectangle of aspect `size` centered in `rect`.
fn fit_centered(size: (f64, f64), rect: Rect) -> Rect {
    let rect = rect.abs();
    let (w, h) = size;
    if w <= 0.0 || h <= 0.0 {
        return rect;
    }
    let scale = (rect.width() / w).min(rect.height() / h);
    let (dw, dh) = (w * scale, h * scale);
    let center = rect.center();
    Rect::new(
        center.x - dw / 2.0,
        center.y - dh / 2.0,
        center.x + dw / 2.0,
        center.y + dh / 2.0,
    )
}
