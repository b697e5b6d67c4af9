//! The track contract and the pieces tracks share.

use super::projection::Projection;
use crate::draw::{FontDescriptor, GraphicsContext};
use crate::units::Length;
use kurbo::{Affine, Point, Rect};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Vertical band of the scene being drawn or hit-tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    Header,
    Contents,
    Footer,
}

/// Stable identifier of a track inside one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub(crate) u64);

/// Free-form string parameters; unknown keys pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Stores `value`, returning whether anything changed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        match self.0.insert(key.into(), value.clone()) {
            Some(previous) => previous != value,
            None => true,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses `key` as a number, logging and ignoring values that are not.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        let raw = self.get(key)?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                log::warn!("Ignoring non-numeric value '{}' for '{}'", raw, key);
                None
            }
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let raw = self.get(key)?;
        match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => {
                log::warn!("Ignoring non-boolean value '{}' for '{}'", raw, key);
                None
            }
        }
    }
}

pub(crate) type Listener = Rc<dyn Fn()>;

/// State a scene shares with its tracks through [`SceneLink`].
pub(crate) struct SceneShared {
    valid: Cell<bool>,
    listeners: RefCell<Vec<Listener>>,
    /// Transient values such as the page being printed.
    pub(crate) transient: RefCell<Parameters>,
}

impl SceneShared {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            valid: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
            transient: RefCell::new(Parameters::new()),
        })
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid.get()
    }

    pub(crate) fn mark_valid(&self) {
        self.valid.set(true);
    }

    pub(crate) fn add_listener(&self, listener: Listener) {
        self.listeners.borrow_mut().push(listener);
    }

    /// Drops the layout; listeners hear about the valid-to-invalid edge only.
    pub(crate) fn invalidate(&self) {
        if !self.valid.replace(false) {
            return;
        }
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener();
        }
    }
}

/// A track's non-owning reference to the scene it belongs to.
#[derive(Clone, Default)]
pub struct SceneLink(Option<Weak<SceneShared>>);

impl SceneLink {
    pub(crate) fn to(shared: &Rc<SceneShared>) -> Self {
        Self(Some(Rc::downgrade(shared)))
    }

    pub fn detached() -> Self {
        Self(None)
    }

    pub fn is_attached(&self) -> bool {
        self.upgrade().is_some()
    }

    /// Invalidates the owning scene's layout; nothing happens when detached.
    pub fn invalidate(&self) {
        if let Some(shared) = self.upgrade() {
            shared.invalidate();
        }
    }

    /// Transient scene parameter, such as `page` while printing.
    pub fn scene_parameter(&self, key: &str) -> Option<String> {
        let shared = self.upgrade()?;
        let transient = shared.transient.borrow();
        transient.get(key).map(str::to_string)
    }

    fn upgrade(&self) -> Option<Rc<SceneShared>> {
        self.0.as_ref().and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for SceneLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneLink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Everything a track needs to draw one band of its column.
#[derive(Debug, Clone)]
pub struct TrackView<'a> {
    /// The column in scene pixels for the band being drawn.
    pub bounds: Rect,
    /// Region that actually needs painting, in the same space.
    pub clip: Rect,
    pub projection: &'a Projection,
    pub font: &'a FontDescriptor,
    /// Page being printed, 1-based.
    pub page: Option<usize>,
    /// Indices of this track's selected models.
    pub selected: &'a [usize],
    /// Whether the scene is drawn with x and y swapped.
    pub transposed: bool,
}

impl TrackView<'_> {
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Depth interval visible through the clip, shallow end first.
    pub fn visible_range(&self) -> (Length, Length) {
        let a = self.projection.to_scene(self.clip.y0);
        let b = self.projection.to_scene(self.clip.y1);
        if b < a { (b, a) } else { (a, b) }
    }

    /// Runs `f` so text drawn at `anchor` reads normally even when the
    /// scene is transposed.
    pub fn upright<R>(
        &self,
        ctx: &mut GraphicsContext<'_>,
        anchor: Point,
        f: impl FnOnce(&mut GraphicsContext<'_>) -> R,
    ) -> R {
        if !self.transposed {
            return f(ctx);
        }
        let local = Affine::translate(anchor.to_vec2())
            * super::TRANSPOSE
            * Affine::translate(-anchor.to_vec2());
        ctx.with_transform(local, f)
    }
}

/// A column of the scene drawing one kind of record against the depth axis.
///
/// Tracks start detached. [`Scene::add_track`](super::Scene::add_track)
/// hands them a [`SceneLink`]; any change that affects layout must go
/// through [`SceneLink::invalidate`].
pub trait Track: Any {
    /// Short kind name, e.g. `"ruler"`.
    fn kind(&self) -> &'static str;

    /// Title drawn in the header band.
    fn title(&self) -> String;

    /// Depth interval covered by the track's records, `None` if it has none.
    fn content_bounds(&self) -> Option<(Length, Length)>;

    /// Width in pixels the track wants when no constraint is set.
    fn natural_width(&self) -> f64;

    /// Draws one band of the column.
    fn render(&self, part: Part, ctx: &mut GraphicsContext<'_>, view: &TrackView<'_>);

    /// Index of the record under `point`, if the track resolves one.
    fn find_model(&self, _point: Point, _part: Part, _view: &TrackView<'_>) -> Option<usize> {
        None
    }

    fn model_count(&self) -> usize;

    fn parameters(&self) -> &Parameters;
    fn parameters_mut(&mut self) -> &mut Parameters;

    fn link(&self) -> &SceneLink;
    fn set_link(&mut self, link: SceneLink);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters().get(key)
    }

    /// Sets a track parameter, invalidating the scene when the value changed.
    fn set_parameter(&mut self, key: &str, value: &str) {
        if self.parameters_mut().set(key, value) {
            self.link().invalidate();
        }
    }
}

/// Records, parameters and scene link shared by the built-in tracks.
#[derive(Debug, Clone)]
pub struct TrackCore<M> {
    models: Vec<M>,
    parameters: Parameters,
    link: SceneLink,
}

impl<M> Default for TrackCore<M> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<M> TrackCore<M> {
    pub fn new(models: Vec<M>) -> Self {
        Self {
            models,
            parameters: Parameters::new(),
            link: SceneLink::detached(),
        }
    }

    pub fn models(&self) -> &[M] {
        &self.models
    }

    pub fn push(&mut self, model: M) {
        self.models.push(model);
        self.link.invalidate();
    }

    pub fn remove(&mut self, index: usize) -> Option<M> {
        if index >= self.models.len() {
            return None;
        }
        let model = self.models.remove(index);
        self.link.invalidate();
        Some(model)
    }

    pub fn set_models(&mut self, models: Vec<M>) {
        self.models = models;
        self.link.invalidate();
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn link(&self) -> &SceneLink {
        &self.link
    }

    pub fn set_link(&mut self, link: SceneLink) {
        self.link = link;
    }

    /// `width` parameter in pixels, or `default`.
    pub fn width_or(&self, default: f64) -> f64 {
        self.parameters
            .get_f64("width")
            .filter(|w| *w >= 0.0)
            .unwrap_or(default)
    }
}
