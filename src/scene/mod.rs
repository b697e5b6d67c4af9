//! Scenes: tracks laid out side by side against a shared depth axis.
//!
//! A [`Scene`] owns its tracks and a cached layout. Every mutation that can
//! move a column or change the depth mapping invalidates the layout;
//! [`Scene::validate`] recomputes it at most once per invalidation. Drawing
//! and hit-testing always validate first, so a stale layout is never read.
//!
//! Scenes are single-threaded. Tracks hold a weak [`SceneLink`] back to the
//! scene so their own mutations can invalidate it.

pub mod command;
pub mod file;
pub mod layout;
pub mod pageable;
pub mod projection;
pub mod track;

#[cfg(test)]
mod tests;

pub use command::{Command, CommandStack, History, SetParameter};
pub use layout::{Column, WidthConstraint};
pub use pageable::{PageableScene, Paper};
pub use projection::Projection;
pub use track::{Parameters, Part, SceneLink, Track, TrackCore, TrackId, TrackView};

use crate::config::{Orientation, Origin, SceneConfig};
use crate::draw::{BLACK, FontDescriptor, GraphicsContext};
use crate::units::Unit;
use kurbo::{Affine, Point, Rect};
use std::rc::Rc;
use track::SceneShared;

/// Swaps x and y; applied on top of a vertical layout to draw it horizontally.
pub const TRANSPOSE: Affine = Affine::new([0.0, 1.0, 1.0, 0.0, 0.0, 0.0]);

/// Scale used when a configured or requested one is unusable.
pub const DEFAULT_SCALE: f64 = 100.0;

/// A selected record: which track, and its index in that track's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub track: TrackId,
    pub index: usize,
}

/// Result of a hit test, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Model(ModelRef),
    Track(TrackId),
    Scene,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Press,
    Release,
    Move,
}

/// Pointer input delivered by the host toolkit, in device coordinates of a part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub point: Point,
    pub part: Part,
    /// Extend the selection instead of replacing it (shift/ctrl click).
    pub extend: bool,
}

impl InputEvent {
    pub fn press(point: Point, part: Part) -> Self {
        Self {
            kind: InputKind::Press,
            point,
            part,
            extend: false,
        }
    }
}

/// Realized layout, only meaningful while the scene is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayout {
    pub columns: Vec<Column>,
    /// Sum of the column widths.
    pub width: f64,
    /// Content extent in scene units, `None` when no track has content.
    pub extent: Option<(f64, f64)>,
    pub projection: Projection,
}

impl SceneLayout {
    fn empty(scale: f64, units: Unit, origin: Origin) -> Self {
        Self {
            columns: Vec::new(),
            width: 0.0,
            extent: None,
            projection: Projection::new(scale, units, origin, (0.0, 0.0)),
        }
    }

    pub fn content_height(&self) -> f64 {
        self.projection.content_height()
    }
}

struct TrackSlot {
    id: TrackId,
    track: Box<dyn Track>,
    constraint: Option<String>,
}

pub struct Scene {
    shared: Rc<SceneShared>,
    slots: Vec<TrackSlot>,
    next_id: u64,
    scale: f64,
    units: Unit,
    origin: Origin,
    orientation: Orientation,
    borders: bool,
    header_height: f64,
    footer_height: f64,
    preferred_width: Option<f64>,
    extra: Parameters,
    font: FontDescriptor,
    layout: SceneLayout,
    layout_passes: usize,
    selection: Vec<ModelRef>,
    commands: Option<Box<dyn CommandStack>>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::from_config(&SceneConfig::default())
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SceneConfig) -> Self {
        let mut scene = Self {
            shared: SceneShared::new(),
            slots: Vec::new(),
            next_id: 1,
            scale: DEFAULT_SCALE,
            units: config.units,
            origin: config.origin,
            orientation: config.orientation,
            borders: config.borders,
            header_height: config.header_height.max(0.0),
            footer_height: config.footer_height.max(0.0),
            preferred_width: config.width.map(f64::from),
            extra: Parameters::new(),
            font: FontDescriptor::default(),
            layout: SceneLayout::empty(DEFAULT_SCALE, config.units, config.origin),
            layout_passes: 0,
            selection: Vec::new(),
            commands: None,
        };
        scene.set_scale(config.scale);
        scene
    }

    // Tracks

    /// Attaches `track` at the right-hand end and returns its id.
    pub fn add_track(&mut self, track: impl Track) -> TrackId {
        self.add_boxed_track(Box::new(track), None)
    }

    /// Attaches `track` with a width constraint such as `"*"`, `"2 in"` or `"120"`.
    pub fn add_track_with(&mut self, track: impl Track, constraint: &str) -> TrackId {
        self.add_boxed_track(Box::new(track), Some(constraint.to_string()))
    }

    pub fn add_boxed_track(&mut self, mut track: Box<dyn Track>, constraint: Option<String>) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        track.set_link(SceneLink::to(&self.shared));
        log::debug!("Added {} track {:?}", track.kind(), id);
        self.slots.push(TrackSlot {
            id,
            track,
            constraint,
        });
        self.invalidate();
        id
    }

    /// Detaches and returns a track; its selected records are deselected.
    pub fn remove_track(&mut self, id: TrackId) -> Option<Box<dyn Track>> {
        let position = self.slots.iter().position(|slot| slot.id == id)?;
        let mut slot = self.slots.remove(position);
        slot.track.set_link(SceneLink::detached());
        self.selection.retain(|m| m.track != id);
        self.invalidate();
        Some(slot.track)
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        self.slots.iter().map(|slot| slot.id).collect()
    }

    pub fn track_count(&self) -> usize {
        self.slots.len()
    }

    pub fn track(&self, id: TrackId) -> Option<&dyn Track> {
        self.slot(id).map(|slot| slot.track.as_ref())
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut (dyn Track + 'static)> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| slot.track.as_mut())
    }

    /// The track as its concrete type.
    pub fn track_as<T: Track>(&self, id: TrackId) -> Option<&T> {
        self.track(id)?.as_any().downcast_ref::<T>()
    }

    pub fn track_as_mut<T: Track>(&mut self, id: TrackId) -> Option<&mut T> {
        self.track_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn constraint(&self, id: TrackId) -> Option<&str> {
        self.slot(id)?.constraint.as_deref()
    }

    pub fn set_constraint(&mut self, id: TrackId, constraint: Option<&str>) {
        let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == id) else {
            return;
        };
        let constraint = constraint.map(str::to_string);
        if slot.constraint != constraint {
            slot.constraint = constraint;
            self.invalidate();
        }
    }

    fn slot(&self, id: TrackId) -> Option<&TrackSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    // Scene parameters

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Pixels per scene unit. Non-positive or non-finite values fall back
    /// to [`DEFAULT_SCALE`].
    pub fn set_scale(&mut self, scale: f64) {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            log::warn!("Invalid scale {}, using {}", scale, DEFAULT_SCALE);
            DEFAULT_SCALE
        };
        if scale != self.scale {
            self.scale = scale;
            self.invalidate();
        }
    }

    pub fn units(&self) -> Unit {
        self.units
    }

    pub fn set_units(&mut self, units: Unit) {
        if units != self.units {
            self.units = units;
            self.invalidate();
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Origin) {
        if origin != self.origin {
            self.origin = origin;
            self.invalidate();
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        if orientation != self.orientation {
            self.orientation = orientation;
            self.invalidate();
        }
    }

    pub fn borders(&self) -> bool {
        self.borders
    }

    pub fn set_borders(&mut self, borders: bool) {
        self.borders = borders;
    }

    pub fn preferred_width(&self) -> Option<f64> {
        self.preferred_width
    }

    pub fn set_preferred_width(&mut self, width: Option<f64>) {
        let width = width.filter(|w| w.is_finite() && *w >= 0.0);
        if width != self.preferred_width {
            self.preferred_width = width;
            self.invalidate();
        }
    }

    pub fn header_height(&self) -> f64 {
        self.header_height
    }

    pub fn set_header_height(&mut self, height: f64) {
        let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        if height != self.header_height {
            self.header_height = height;
            self.invalidate();
        }
    }

    pub fn footer_height(&self) -> f64 {
        self.footer_height
    }

    pub fn set_footer_height(&mut self, height: f64) {
        let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        if height != self.footer_height {
            self.footer_height = height;
            self.invalidate();
        }
    }

    pub fn font(&self) -> &FontDescriptor {
        &self.font
    }

    pub fn set_font(&mut self, font: FontDescriptor) {
        self.font = font;
    }

    /// Reads a parameter by its string key.
    pub fn parameter(&self, key: &str) -> Option<String> {
        match key {
            "origin" => Some(self.origin.to_string()),
            "orientation" => Some(self.orientation.to_string()),
            "scale" => Some(self.scale.to_string()),
            "units" => Some(self.units.to_string()),
            "borders" => Some(self.borders.to_string()),
            "width" => self.preferred_width.map(|w| w.to_string()),
            "header-height" => Some(self.header_height.to_string()),
            "footer-height" => Some(self.footer_height.to_string()),
            "page" => self.shared.transient.borrow().get(key).map(str::to_string),
            other => self.extra.get(other).map(str::to_string),
        }
    }

    /// Sets a parameter from its string form.
    ///
    /// Recognized keys fall back to their documented default when the value
    /// does not parse; unknown keys are stored untouched.
    pub fn set_parameter(&mut self, key: &str, value: &str) {
        match key {
            "origin" => self.set_origin(Origin::parse_or_default(value)),
            "orientation" => self.set_orientation(Orientation::parse_or_default(value)),
            "scale" => self.set_scale(value.trim().parse().unwrap_or(f64::NAN)),
            "units" => self.set_units(Unit::from_abbreviation(value).unwrap_or_else(|| {
                log::warn!("Unknown units '{}', using m", value);
                Unit::Meter
            })),
            "borders" => self.set_borders(match value.trim().to_lowercase().as_str() {
                "false" | "no" | "off" | "0" => false,
                "true" | "yes" | "on" | "1" => true,
                other => {
                    log::warn!("Invalid borders value '{}', using true", other);
                    true
                }
            }),
            "width" => self.set_preferred_width(value.trim().parse().ok()),
            "header-height" => self.set_header_height(value.trim().parse().unwrap_or(0.0)),
            "footer-height" => self.set_footer_height(value.trim().parse().unwrap_or(0.0)),
            "page" => {
                self.shared.transient.borrow_mut().set(key, value);
            }
            other => {
                self.extra.set(other, value);
            }
        }
    }

    /// Clears a pass-through or transient parameter.
    pub fn remove_parameter(&mut self, key: &str) -> Option<String> {
        if key == "page" {
            return self.shared.transient.borrow_mut().remove(key);
        }
        self.extra.remove(key)
    }

    // Layout state

    /// Registers a callback run whenever the layout goes from valid to invalid.
    pub fn add_change_listener(&mut self, listener: impl Fn() + 'static) {
        self.shared.add_listener(Rc::new(listener));
    }

    pub fn is_valid(&self) -> bool {
        self.shared.is_valid()
    }

    pub fn invalidate(&self) {
        self.shared.invalidate();
    }

    /// How many times the layout has been computed.
    pub fn layout_passes(&self) -> usize {
        self.layout_passes
    }

    /// Recomputes the layout if it is invalid and returns it.
    pub fn validate(&mut self) -> &SceneLayout {
        if !self.shared.is_valid() {
            self.layout = self.compute_layout();
            self.layout_passes += 1;
            self.prune_selection();
            self.shared.mark_valid();
            log::debug!(
                "Layout pass {}: {} columns, width {}, content {:?}",
                self.layout_passes,
                self.layout.columns.len(),
                self.layout.width,
                self.layout.projection.content
            );
        }
        &self.layout
    }

    fn compute_layout(&self) -> SceneLayout {
        let constraints: Vec<(WidthConstraint, f64)> = self
            .slots
            .iter()
            .map(|slot| {
                (
                    WidthConstraint::parse(slot.constraint.as_deref()),
                    slot.track.natural_width(),
                )
            })
            .collect();
        let widths = layout::distribute(&constraints, self.preferred_width);
        let columns = layout::place(&widths);
        let width = widths.iter().sum();

        let extent = self
            .slots
            .iter()
            .filter_map(|slot| slot.track.content_bounds())
            .map(|(top, base)| {
                let (a, b) = (top.value_in(self.units), base.value_in(self.units));
                (a.min(b), a.max(b))
            })
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
        let content = layout::pixel_bounds(extent, self.scale);

        SceneLayout {
            columns,
            width,
            extent,
            projection: Projection::new(self.scale, self.units, self.origin, content),
        }
    }

    fn prune_selection(&mut self) {
        let slots = &self.slots;
        self.selection.retain(|m| {
            slots
                .iter()
                .find(|slot| slot.id == m.track)
                .is_some_and(|slot| m.index < slot.track.model_count())
        });
    }

    /// Laid-out width in pixels.
    pub fn width(&mut self) -> f64 {
        self.validate().width
    }

    pub fn content_height(&mut self) -> f64 {
        self.validate().content_height()
    }

    pub fn projection(&mut self) -> Projection {
        self.validate().projection
    }

    /// Column of `id` in the current layout.
    pub fn column(&mut self, id: TrackId) -> Option<Column> {
        let position = self.slots.iter().position(|slot| slot.id == id)?;
        self.validate().columns.get(position).copied()
    }

    /// Device size of [`render_document`](Self::render_document) output.
    pub fn document_size(&mut self) -> (f64, f64) {
        let (header, footer) = (self.header_height, self.footer_height);
        let layout = self.validate();
        let size = (layout.width, header + layout.content_height() + footer);
        match self.orientation {
            Orientation::Vertical => size,
            Orientation::Horizontal => (size.1, size.0),
        }
    }

    fn transposed(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    // Hit testing and input

    /// Finds what lies under `point` in `part`.
    pub fn find_at(&mut self, point: Point, part: Part) -> Hit {
        self.validate();
        let point = if self.transposed() {
            Point::new(point.y, point.x)
        } else {
            point
        };
        let Some(position) = self
            .layout
            .columns
            .iter()
            .position(|column| column.contains_x(point.x))
        else {
            return Hit::Scene;
        };

        let slot = &self.slots[position];
        let bounds = self.band_rect(self.layout.columns[position], part);
        let selected = self.selected_indices(slot.id);
        let view = self.view(bounds, bounds, &selected);
        match slot.track.find_model(point, part, &view) {
            Some(index) if index < slot.track.model_count() => Hit::Model(ModelRef {
                track: slot.id,
                index,
            }),
            _ => Hit::Track(slot.id),
        }
    }

    /// Hit-tests an input event; a press updates the selection.
    pub fn dispatch(&mut self, event: InputEvent) -> Hit {
        let hit = self.find_at(event.point, event.part);
        if event.kind == InputKind::Press {
            match hit {
                Hit::Model(model) => self.select(model, event.extend),
                Hit::Track(_) | Hit::Scene if !event.extend => self.clear_selection(),
                _ => {}
            }
        }
        hit
    }

    pub fn selection(&self) -> &[ModelRef] {
        &self.selection
    }

    pub fn is_selected(&self, model: ModelRef) -> bool {
        self.selection.contains(&model)
    }

    /// Selects `model`. With `extend` the model is toggled in the existing
    /// selection, otherwise it replaces it.
    pub fn select(&mut self, model: ModelRef, extend: bool) {
        let exists = self
            .slot(model.track)
            .is_some_and(|slot| model.index < slot.track.model_count());
        if !exists {
            log::debug!("Ignoring selection of unknown record {:?}", model);
            return;
        }
        if !extend {
            self.selection = vec![model];
        } else if let Some(position) = self.selection.iter().position(|m| *m == model) {
            self.selection.remove(position);
        } else {
            self.selection.push(model);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn selected_indices(&self, id: TrackId) -> Vec<usize> {
        self.selection
            .iter()
            .filter(|m| m.track == id)
            .map(|m| m.index)
            .collect()
    }

    // Undo

    /// Installs the stack that records executed commands.
    pub fn set_command_stack(&mut self, stack: Box<dyn CommandStack>) {
        self.commands = Some(stack);
    }

    /// Applies `command` and records it when a command stack is installed.
    pub fn execute(&mut self, mut command: Box<dyn Command>) {
        command.apply(self);
        if let Some(stack) = self.commands.as_mut() {
            stack.push(command);
        }
    }

    pub fn undo(&mut self) -> bool {
        let Some(mut stack) = self.commands.take() else {
            return false;
        };
        let done = stack.undo(self);
        self.commands = Some(stack);
        done
    }

    pub fn redo(&mut self) -> bool {
        let Some(mut stack) = self.commands.take() else {
            return false;
        };
        let done = stack.redo(self);
        self.commands = Some(stack);
        done
    }

    // Rendering

    /// Draws one band of the scene.
    ///
    /// `clip` is in the band's coordinates: scene pixels for
    /// [`Part::Contents`], `0..header_height` or `0..footer_height` for the
    /// header and footer. Horizontal scenes take device coordinates and are
    /// transposed internally.
    pub fn render(&mut self, part: Part, ctx: &mut GraphicsContext<'_>, clip: Rect) {
        self.validate();
        if self.transposed() {
            let clip = transpose_rect(clip);
            ctx.with_transform(TRANSPOSE, |ctx| self.render_band(part, ctx, clip));
        } else {
            self.render_band(part, ctx, clip);
        }
    }

    /// Draws header, contents and footer stacked, at [`document_size`](Self::document_size).
    pub fn render_document(&mut self, ctx: &mut GraphicsContext<'_>) {
        self.validate();
        let transform = if self.transposed() {
            TRANSPOSE
        } else {
            Affine::IDENTITY
        };
        ctx.with_transform(transform, |ctx| self.render_stacked(ctx, None));
    }

    /// Header, a window of the contents, and footer stacked top to bottom in
    /// layout space. `window` defaults to the whole content.
    pub(crate) fn render_stacked(&self, ctx: &mut GraphicsContext<'_>, window: Option<(f64, f64)>) {
        let width = self.layout.width;
        let (top, bottom) = window.unwrap_or(self.layout.projection.content);
        let header = self.header_height;

        self.render_band(Part::Header, ctx, Rect::new(0.0, 0.0, width, header));
        ctx.with_transform(Affine::translate((0.0, header - top)), |ctx| {
            self.render_band(Part::Contents, ctx, Rect::new(0.0, top, width, bottom));
        });
        ctx.with_transform(Affine::translate((0.0, header + bottom - top)), |ctx| {
            self.render_band(
                Part::Footer,
                ctx,
                Rect::new(0.0, 0.0, width, self.footer_height),
            );
        });
    }

    /// Draws every column intersecting `clip`. Layout must be valid.
    fn render_band(&self, part: Part, ctx: &mut GraphicsContext<'_>, clip: Rect) {
        let clip = clip.abs();
        if clip.width() <= 0.0 || clip.height() <= 0.0 {
            return;
        }
        for (slot, column) in self.slots.iter().zip(&self.layout.columns) {
            if column.width <= 0.0 || column.right() <= clip.x0 || column.x >= clip.x1 {
                continue;
            }
            let bounds = self.band_rect(*column, part);
            let column_clip = Rect::new(
                column.x.max(clip.x0),
                clip.y0,
                column.right().min(clip.x1),
                clip.y1,
            );
            let selected = self.selected_indices(slot.id);
            let view = self.view(bounds, column_clip, &selected);

            ctx.with_state(|ctx| {
                ctx.set_clip(column_clip);
                slot.track.render(part, ctx, &view);
                if self.borders {
                    ctx.set_line_color(BLACK);
                    ctx.set_line_thickness(1.0);
                    ctx.stroke_rect(bounds);
                }
            });
        }
    }

    fn band_rect(&self, column: Column, part: Part) -> Rect {
        let (y0, y1) = match part {
            Part::Header => (0.0, self.header_height),
            Part::Contents => self.layout.projection.content,
            Part::Footer => (0.0, self.footer_height),
        };
        Rect::new(column.x, y0, column.right(), y1)
    }

    fn view<'a>(&'a self, bounds: Rect, clip: Rect, selected: &'a [usize]) -> TrackView<'a> {
        let page = self
            .shared
            .transient
            .borrow()
            .get("page")
            .and_then(|p| p.parse().ok());
        TrackView {
            bounds,
            clip,
            projection: &self.layout.projection,
            font: &self.font,
            page,
            selected,
            transposed: self.transposed(),
        }
    }

    /// Last computed layout, without validating.
    pub(crate) fn laid_out(&self) -> &SceneLayout {
        &self.layout
    }

    pub(crate) fn shared(&self) -> &Rc<SceneShared> {
        &self.shared
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("tracks", &self.slots.len())
            .field("scale", &self.scale)
            .field("units", &self.units)
            .field("origin", &self.origin)
            .field("orientation", &self.orientation)
            .field("valid", &self.is_valid())
            .finish()
    }
}

fn transpose_rect(rect: Rect) -> Rect {
    Rect::new(rect.y0, rect.x0, rect.y1, rect.x1)
}
