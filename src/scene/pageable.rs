//! Splitting a scene into printed pages.

use super::track::SceneShared;
use super::{Scene, TRANSPOSE};
use crate::config::{Orientation, PaperSize};
use crate::draw::GraphicsContext;
use crate::units::{Length, POINTS_PER_INCH};
use kurbo::{Affine, Rect};
use std::rc::Rc;

/// A sheet of paper in points, with its imageable margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paper {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Paper {
    pub fn letter() -> Self {
        Self {
            width: 8.5 * POINTS_PER_INCH,
            height: 11.0 * POINTS_PER_INCH,
            margin: POINTS_PER_INCH / 2.0,
        }
    }

    pub fn a4() -> Self {
        Self {
            width: 210.0 / 25.4 * POINTS_PER_INCH,
            height: 297.0 / 25.4 * POINTS_PER_INCH,
            margin: POINTS_PER_INCH / 2.0,
        }
    }

    pub fn from_config(size: PaperSize, landscape: bool) -> Self {
        let paper = match size {
            PaperSize::Letter => Self::letter(),
            PaperSize::A4 => Self::a4(),
        };
        if landscape { paper.landscape() } else { paper }
    }

    /// The same sheet turned sideways.
    pub fn landscape(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
            margin: self.margin,
        }
    }

    /// Printable area inside the margins.
    pub fn imageable(&self) -> Rect {
        Rect::new(
            self.margin,
            self.margin,
            (self.width - self.margin).max(self.margin),
            (self.height - self.margin).max(self.margin),
        )
    }
}

impl Default for Paper {
    fn default() -> Self {
        Self::letter()
    }
}

/// Sets the scene's `page` parameter for as long as it lives.
struct PageGuard {
    shared: Rc<SceneShared>,
}

impl PageGuard {
    fn set(shared: &Rc<SceneShared>, page: usize) -> Self {
        shared
            .transient
            .borrow_mut()
            .set("page", page.to_string());
        Self {
            shared: shared.clone(),
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.shared.transient.borrow_mut().remove("page");
    }
}

/// Renders a scene one page at a time.
///
/// The wrapped scene's scale is overwritten so that one page's printable
/// height, less the header and footer, spans exactly `units_per_page`.
pub struct PageableScene<'a> {
    scene: &'a mut Scene,
    paper: Paper,
    start: Option<Length>,
    units_per_page: Length,
}

impl<'a> PageableScene<'a> {
    pub fn new(scene: &'a mut Scene, paper: Paper, units_per_page: Length) -> Self {
        let mut pageable = Self {
            scene,
            paper,
            start: None,
            units_per_page,
        };
        pageable.apply_scale();
        pageable
    }

    /// Starts the first page at `start` instead of the top of the content.
    pub fn with_start(mut self, start: Length) -> Self {
        self.start = Some(start);
        self
    }

    pub fn scene(&mut self) -> &mut Scene {
        &mut *self.scene
    }

    pub fn paper(&self) -> Paper {
        self.paper
    }

    pub fn units_per_page(&self) -> Length {
        self.units_per_page
    }

    pub fn set_units_per_page(&mut self, units_per_page: Length) {
        self.units_per_page = units_per_page;
        self.apply_scale();
    }

    fn depth_extent(&self) -> f64 {
        let area = self.paper.imageable();
        match self.scene.orientation() {
            Orientation::Vertical => area.height(),
            Orientation::Horizontal => area.width(),
        }
    }

    /// Pixels available for contents on one page.
    pub fn printable_content_height(&self) -> f64 {
        self.depth_extent() - self.scene.header_height() - self.scene.footer_height()
    }

    fn units(&self) -> f64 {
        let units = self.units_per_page.value_in(self.scene.units());
        if units.is_finite() && units > 0.0 {
            units
        } else {
            log::warn!("Invalid units per page {}, using 1 {}", self.units_per_page, self.scene.units());
            1.0
        }
    }

    fn apply_scale(&mut self) {
        let height = self.printable_content_height();
        if height <= 0.0 {
            log::warn!(
                "Header and footer leave no room for contents on a {}x{} page",
                self.paper.width,
                self.paper.height
            );
        }
        let scale = height.max(1.0) / self.units();
        self.scene.set_scale(scale);
    }

    fn start_value(&mut self) -> f64 {
        let units = self.scene.units();
        match self.start {
            Some(start) => start.value_in(units),
            None => self.scene.validate().extent.map_or(0.0, |(min, _)| min),
        }
    }

    /// Number of pages needed to reach the deepest content, 0 when empty.
    pub fn page_count(&mut self) -> usize {
        self.apply_scale();
        let start = self.start_value();
        let Some((_, max)) = self.scene.validate().extent else {
            return 0;
        };
        let pages = ((max - start) / self.units() - 1e-9).ceil();
        if pages > 0.0 { pages as usize } else { 0 }
    }

    /// Pixel window of page `page` (1-based), top edge first.
    pub fn page_window(&mut self, page: usize) -> (f64, f64) {
        self.apply_scale();
        let start = self.start_value();
        let units = self.units();
        let scene_units = self.scene.units();
        let top = Length::new(start + (page.max(1) - 1) as f64 * units, scene_units);
        let base = Length::new(start + page.max(1) as f64 * units, scene_units);
        self.scene.validate().projection.span(top, base)
    }

    /// Draws page `page` (1-based) into a paper-sized context. Returns
    /// `false` for pages out of range.
    pub fn render_page(&mut self, page: usize, ctx: &mut GraphicsContext<'_>) -> bool {
        let count = self.page_count();
        if page == 0 || page > count {
            log::warn!("Page {} out of range 1..={}", page, count);
            return false;
        }
        let window = self.page_window(page);
        let area = self.paper.imageable();
        let mut transform = Affine::translate((area.x0, area.y0));
        if self.scene.orientation() == Orientation::Horizontal {
            transform *= TRANSPOSE;
        }

        let scene: &Scene = &*self.scene;
        let _page = PageGuard::set(scene.shared(), page);
        ctx.with_transform(transform, |ctx| {
            ctx.with_state(|ctx| {
                let width = scene.laid_out().width;
                let height = scene.header_height() + (window.1 - window.0) + scene.footer_height();
                ctx.set_clip(Rect::new(0.0, 0.0, width, height));
                scene.render_stacked(ctx, Some(window));
            })
        });
        log::debug!("Rendered page {} of {}", page, count);
        true
    }

    /// Renders every page, ending each one. Returns the number rendered.
    pub fn render_pages(&mut self, ctx: &mut GraphicsContext<'_>) -> usize {
        let count = self.page_count();
        for page in 1..=count {
            self.render_page(page, ctx);
            ctx.end_page();
        }
        count
    }
}
