use super::*;
use crate::draw::recording::RecordingDriver;
use crate::model::{CoreImage, Section};
use crate::tracks::{ImageTrack, RulerTrack, SectionTrack};
use crate::units::Length;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};

fn meters(value: f64) -> Length {
    Length::meters(value)
}

fn sections() -> SectionTrack {
    SectionTrack::new(vec![
        Section::new("A", meters(0.0), meters(1.0)),
        Section::new("B", meters(1.0), meters(2.5)),
    ])
}

/// Scene from the example scenario: a ruler plus one 0-2 m image at 10 px/m.
fn ruler_and_image() -> (Scene, TrackId, TrackId) {
    let mut scene = Scene::new();
    scene.set_scale(10.0);
    let ruler = scene.add_track(RulerTrack::new());
    let image = scene.add_track(ImageTrack::new(vec![CoreImage::new(
        "/nowhere/box1.png",
        meters(0.0),
        meters(2.0),
    )]));
    (scene, ruler, image)
}

/// Records the page each header render sees, optionally panicking.
#[derive(Default)]
struct Probe {
    parameters: Parameters,
    link: SceneLink,
    pages: Rc<RefCell<Vec<Option<usize>>>>,
    panic: bool,
}

impl Track for Probe {
    fn kind(&self) -> &'static str {
        "probe"
    }

    fn title(&self) -> String {
        "probe".into()
    }

    fn content_bounds(&self) -> Option<(Length, Length)> {
        Some((meters(0.0), meters(2.5)))
    }

    fn natural_width(&self) -> f64 {
        30.0
    }

    fn render(&self, part: Part, _ctx: &mut GraphicsContext<'_>, view: &TrackView<'_>) {
        if part == Part::Header {
            self.pages.borrow_mut().push(view.page);
            if self.panic {
                panic!("probe failure");
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

#[test]
fn ruler_and_image_scenario() {
    let (mut scene, ruler, image) = ruler_and_image();
    assert_eq!(scene.content_height(), 20.0);
    let width = scene.width();
    assert_eq!(scene.column(ruler).unwrap().width, 60.0);
    assert_eq!(scene.column(image).unwrap().x, 60.0);

    let mut driver = RecordingDriver::new();
    {
        let mut ctx = GraphicsContext::new(&mut driver);
        scene.render(Part::Contents, &mut ctx, Rect::new(0.0, 0.0, width, 10.0));
    }
    let images = driver.image_calls();
    assert_eq!(images.len(), 1);
    let y = images[0].device.y0;
    assert!((0.0..10.0).contains(&y), "image drawn at y = {y}");
}

#[test]
fn validate_runs_layout_once() {
    let (mut scene, _, _) = ruler_and_image();
    let first = scene.validate().clone();
    let second = scene.validate().clone();
    assert_eq!(scene.layout_passes(), 1);
    assert_eq!(first, second);

    scene.set_scale(20.0);
    scene.validate();
    scene.validate();
    assert_eq!(scene.layout_passes(), 2);
}

#[test]
fn listeners_hear_each_invalidation_once() {
    let (mut scene, _, _) = ruler_and_image();
    let count = Rc::new(Cell::new(0));
    let seen = count.clone();
    scene.add_change_listener(move || seen.set(seen.get() + 1));

    scene.validate();
    scene.set_scale(5.0);
    scene.set_units(crate::units::Unit::Foot);
    scene.set_origin(Origin::Base);
    assert_eq!(count.get(), 1);

    scene.validate();
    scene.set_preferred_width(Some(400.0));
    assert_eq!(count.get(), 2);

    scene.validate();
    scene.set_scale(5.0);
    assert_eq!(count.get(), 2, "unchanged values do not invalidate");
}

#[test]
fn model_changes_invalidate_through_the_link() {
    let mut scene = Scene::new();
    let id = scene.add_track(sections());
    scene.validate();
    assert!(scene.is_valid());

    scene
        .track_as_mut::<SectionTrack>(id)
        .unwrap()
        .add_section(Section::new("C", meters(2.5), meters(4.0)));
    assert!(!scene.is_valid());
    assert_eq!(scene.content_height(), 400.0);

    scene.validate();
    scene.track_mut(id).unwrap().set_parameter("width", "150");
    assert!(!scene.is_valid());
    assert_eq!(scene.column(id).unwrap().width, 150.0);
}

#[test]
fn removed_tracks_are_detached() {
    let mut scene = Scene::new();
    let id = scene.add_track(sections());
    assert!(scene.track(id).unwrap().link().is_attached());

    let mut track = scene.remove_track(id).unwrap();
    assert!(!track.link().is_attached());
    assert_eq!(scene.track_count(), 0);

    scene.validate();
    let section = track.as_any_mut().downcast_mut::<SectionTrack>().unwrap();
    section.add_section(Section::new("D", meters(0.0), meters(1.0)));
    assert!(scene.is_valid(), "detached tracks no longer reach the scene");
}

#[test]
fn tracks_without_content_do_not_widen_the_extent() {
    let mut scene = Scene::new();
    scene.add_track(RulerTrack::new());
    assert_eq!(scene.content_height(), 0.0);
    assert_eq!(scene.validate().extent, None);

    scene.set_scale(10.0);
    scene.add_track(SectionTrack::new(vec![Section::new(
        "deep",
        meters(3.04),
        meters(4.96),
    )]));
    let layout = scene.validate();
    assert_eq!(layout.projection.content, (30.0, 50.0));
}

#[test]
fn projection_inverts_for_both_origins() {
    for origin in [Origin::Top, Origin::Base] {
        let mut scene = Scene::new();
        scene.set_scale(37.0);
        scene.set_origin(origin);
        scene.add_track(SectionTrack::new(vec![Section::new(
            "A",
            meters(1.25),
            meters(7.5),
        )]));
        let projection = scene.projection();
        for step in 0..=25 {
            let depth = meters(1.25 + step as f64 * 0.25);
            let back = projection.to_scene(projection.to_screen(depth));
            assert!((back.value - depth.value).abs() < 1e-9, "{origin}: {depth}");
        }
    }
}

#[test]
fn base_origin_mirrors_records() {
    let (mut scene, _, image) = ruler_and_image();
    scene.set_origin(Origin::Base);
    let projection = scene.projection();
    assert_eq!(projection.to_screen(meters(0.0)), 20.0);
    assert_eq!(projection.to_screen(meters(2.0)), 0.0);

    let mut driver = RecordingDriver::new();
    {
        let mut ctx = GraphicsContext::new(&mut driver);
        scene.render(Part::Contents, &mut ctx, Rect::new(0.0, 0.0, 500.0, 20.0));
    }
    let column = scene.column(image).unwrap();
    assert_eq!(
        driver.image_calls()[0].dest,
        Rect::new(column.x, 0.0, column.right(), 20.0)
    );
}

#[test]
fn elastic_tracks_fill_the_preferred_width() {
    let mut scene = Scene::new();
    let ruler = scene.add_track_with(RulerTrack::new(), "60");
    let boxes = scene.add_track_with(sections(), "*");
    let scans = scene.add_track_with(ImageTrack::default(), "*");
    let inch = scene.add_track_with(RulerTrack::new(), "1 in");
    scene.set_preferred_width(Some(301.0));

    assert_eq!(scene.width(), 301.0);
    assert_eq!(scene.column(ruler).unwrap().width, 60.0);
    assert_eq!(scene.column(inch).unwrap().width, 72.0);
    assert_eq!(scene.column(boxes).unwrap().width, 85.0);
    assert_eq!(scene.column(scans).unwrap().width, 84.0);
    assert_eq!(scene.column(scans).unwrap().x, 145.0);

    scene.set_constraint(boxes, None);
    scene.set_constraint(scans, None);
    assert_eq!(scene.width(), 60.0 + 80.0 + 120.0 + 72.0);
}

#[test]
fn hit_testing_resolves_records_tracks_and_scene() {
    let mut scene = Scene::new();
    let ruler = scene.add_track(RulerTrack::new());
    let boxes = scene.add_track(sections());

    let hit = scene.find_at(Point::new(70.0, 150.0), Part::Contents);
    assert_eq!(hit, Hit::Model(ModelRef { track: boxes, index: 1 }));
    assert_eq!(scene.find_at(Point::new(10.0, 150.0), Part::Contents), Hit::Track(ruler));
    assert_eq!(scene.find_at(Point::new(70.0, 10.0), Part::Header), Hit::Track(boxes));
    assert_eq!(scene.find_at(Point::new(70.0, 900.0), Part::Contents), Hit::Track(boxes));
    assert_eq!(scene.find_at(Point::new(500.0, 10.0), Part::Contents), Hit::Scene);
}

#[test]
fn presses_drive_the_selection() {
    let mut scene = Scene::new();
    let boxes = scene.add_track(sections());
    let a = ModelRef { track: boxes, index: 0 };
    let b = ModelRef { track: boxes, index: 1 };

    scene.dispatch(InputEvent::press(Point::new(10.0, 50.0), Part::Contents));
    assert_eq!(scene.selection(), &[a]);

    let mut extend = InputEvent::press(Point::new(10.0, 150.0), Part::Contents);
    extend.extend = true;
    scene.dispatch(extend);
    assert_eq!(scene.selection(), &[a, b]);
    scene.dispatch(extend);
    assert_eq!(scene.selection(), &[a]);

    let mut hover = InputEvent::press(Point::new(10.0, 150.0), Part::Contents);
    hover.kind = InputKind::Move;
    scene.dispatch(hover);
    assert_eq!(scene.selection(), &[a]);

    scene.dispatch(InputEvent::press(Point::new(10.0, 900.0), Part::Contents));
    assert!(scene.selection().is_empty());
}

#[test]
fn selection_drops_records_that_disappear() {
    let mut scene = Scene::new();
    let boxes = scene.add_track(sections());
    scene.select(ModelRef { track: boxes, index: 1 }, false);
    scene.select(ModelRef { track: boxes, index: 7 }, true);
    assert_eq!(scene.selection().len(), 1);

    scene.track_as_mut::<SectionTrack>(boxes).unwrap().remove_section(1);
    scene.validate();
    assert!(scene.selection().is_empty());
}

#[test]
fn horizontal_scenes_are_transposed() {
    let (mut scene, _, image) = ruler_and_image();
    scene.set_orientation(Orientation::Horizontal);
    scene.set_constraint(image, Some("100"));

    let hit = scene.find_at(Point::new(5.0, 100.0), Part::Contents);
    assert_eq!(hit, Hit::Model(ModelRef { track: image, index: 0 }));

    let mut driver = RecordingDriver::new();
    {
        let mut ctx = GraphicsContext::new(&mut driver);
        scene.render(Part::Contents, &mut ctx, Rect::new(0.0, 0.0, 20.0, 160.0));
        assert_eq!(ctx.transform(), Affine::IDENTITY);
    }
    assert_eq!(driver.image_calls()[0].device, Rect::new(0.0, 60.0, 20.0, 160.0));
    assert_eq!(scene.document_size(), (40.0 + 20.0 + 20.0, 160.0));
}

#[test]
fn document_stacks_header_contents_and_footer() {
    let (mut scene, _, _) = ruler_and_image();
    assert_eq!(scene.document_size(), (180.0, 40.0 + 20.0 + 20.0));

    let mut driver = RecordingDriver::new();
    {
        let mut ctx = GraphicsContext::new(&mut driver);
        scene.render_document(&mut ctx);
    }
    assert_eq!(driver.image_calls()[0].device.y0, 40.0);
    let texts = driver.texts();
    assert!(texts.iter().any(|t| t == "Depth (m)"), "{texts:?}");
    assert!(texts.iter().any(|t| t == "Core images"), "{texts:?}");
}

#[test]
fn invalid_parameters_fall_back_to_defaults() {
    let mut scene = Scene::new();
    scene.set_parameter("scale", "-4");
    assert_eq!(scene.scale(), DEFAULT_SCALE);
    scene.set_parameter("scale", "25");
    scene.set_parameter("scale", "fast");
    assert_eq!(scene.scale(), DEFAULT_SCALE);
    scene.set_parameter("units", "cubits");
    assert_eq!(scene.units(), crate::units::Unit::Meter);
    scene.set_parameter("origin", "sideways");
    assert_eq!(scene.origin(), Origin::Top);
    scene.set_parameter("borders", "maybe");
    assert!(scene.borders());
    scene.set_parameter("colour", "teal");
    assert_eq!(scene.parameter("colour").as_deref(), Some("teal"));
}

#[test]
fn commands_undo_and_redo() {
    let mut scene = Scene::new();
    assert!(!scene.undo());
    scene.set_command_stack(Box::new(History::default()));

    scene.execute(Box::new(SetParameter::new("origin", "base")));
    scene.execute(Box::new(SetParameter::new("legend", "on")));
    assert_eq!(scene.origin(), Origin::Base);

    assert!(scene.undo());
    assert_eq!(scene.parameter("legend"), None);
    assert!(scene.undo());
    assert_eq!(scene.origin(), Origin::Top);
    assert!(!scene.undo());

    assert!(scene.redo());
    assert_eq!(scene.origin(), Origin::Base);
}

#[test]
fn pages_divide_the_content() {
    let mut scene = Scene::new();
    scene.add_track(sections());
    let mut pages = PageableScene::new(&mut scene, Paper::letter(), meters(1.0));
    // 11 in - 1 in of margins, less 40 px header and 20 px footer.
    assert_eq!(pages.printable_content_height(), 660.0);
    assert_eq!(pages.scene().scale(), 660.0);
    assert_eq!(pages.page_count(), 3);
    assert_eq!(pages.page_window(2), (660.0, 1320.0));

    pages.set_units_per_page(Length::new(50.0, crate::units::Unit::Centimeter));
    assert_eq!(pages.scene().scale(), 1320.0);
    assert_eq!(pages.page_count(), 5);
}

#[test]
fn empty_scenes_have_no_pages() {
    let mut scene = Scene::new();
    scene.add_track(RulerTrack::new());
    let mut pages = PageableScene::new(&mut scene, Paper::a4(), meters(1.0));
    assert_eq!(pages.page_count(), 0);
    let mut driver = RecordingDriver::new();
    let mut ctx = GraphicsContext::new(&mut driver);
    assert!(!pages.render_page(1, &mut ctx));
}

#[test]
fn page_parameter_is_scoped_to_the_render() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut scene = Scene::new();
    scene.add_track(Probe {
        pages: seen.clone(),
        ..Default::default()
    });
    {
        let mut pages = PageableScene::new(&mut scene, Paper::letter(), meters(1.0));
        let mut driver = RecordingDriver::new();
        let mut ctx = GraphicsContext::new(&mut driver);
        assert_eq!(pages.render_pages(&mut ctx), 3);
    }
    assert_eq!(*seen.borrow(), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(scene.parameter("page"), None);
}

#[test]
fn page_parameter_is_cleared_when_rendering_panics() {
    let mut scene = Scene::new();
    scene.add_track(Probe {
        panic: true,
        ..Default::default()
    });
    let mut driver = RecordingDriver::new();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut pages = PageableScene::new(&mut scene, Paper::letter(), meters(1.0));
        let mut ctx = GraphicsContext::new(&mut driver);
        pages.render_page(2, &mut ctx);
    }));
    assert!(result.is_err());
    assert_eq!(scene.parameter("page"), None);
}

#[test]
fn landscape_paper_swaps_dimensions() {
    let paper = Paper::letter().landscape();
    assert_eq!((paper.width, paper.height), (792.0, 612.0));
    assert_eq!(paper.imageable(), Rect::new(36.0, 36.0, 756.0, 576.0));
    assert_eq!(Paper::from_config(crate::config::PaperSize::A4, false), Paper::a4());
}
