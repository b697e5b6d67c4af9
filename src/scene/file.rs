//! Scene description files.
//!
//! ```toml
//! [scene]
//! origin = "top"
//! scale = 50
//!
//! [[tracks]]
//! kind = "ruler"
//! width = 60
//!
//! [[tracks]]
//! kind = "image"
//! width = "*"
//! images = [{ url = "scans/box1.jpg", top = "0 m", base = "1.2 m" }]
//! ```

use super::Scene;
use crate::config::Config;
use crate::model::{CoreImage, Section};
use crate::tracks::{ImageTrack, RulerTrack, SectionTrack};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackKind {
    Ruler,
    Section,
    Image,
}

/// One `[[tracks]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackSpec {
    pub kind: TrackKind,
    /// Width constraint: a number of pixels, a length such as `"2 in"`, or `"*"`.
    #[serde(default)]
    pub width: Option<toml::Value>,
    #[serde(default)]
    pub parameters: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub images: Vec<CoreImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneFile {
    /// Scene parameters overriding the configured defaults.
    #[serde(default)]
    pub scene: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub tracks: Vec<TrackSpec>,
}

impl SceneFile {
    /// Reads a scene file, resolving relative image paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file {}", path.display()))?;
        let mut file: SceneFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse scene file {}", path.display()))?;
        if let Some(dir) = path.parent() {
            file.resolve_paths(dir);
        }
        log::debug!(
            "Loaded scene file {} with {} tracks",
            path.display(),
            file.tracks.len()
        );
        Ok(file)
    }

    fn resolve_paths(&mut self, dir: &Path) {
        for track in &mut self.tracks {
            for image in &mut track.images {
                if is_relative_path(&image.url) {
                    image.url = dir.join(&image.url).to_string_lossy().into_owned();
                }
            }
        }
    }

    /// Builds a scene from the configured defaults plus this file.
    pub fn build(&self, config: &Config) -> Scene {
        let mut scene = Scene::from_config(&config.scene);
        scene.set_font(config.text.font());
        for (key, value) in &self.scene {
            scene.set_parameter(key, &value_text(value));
        }

        for spec in &self.tracks {
            let constraint = spec.width.as_ref().map(value_text);
            let id = match spec.kind {
                TrackKind::Ruler => scene.add_boxed_track(Box::new(RulerTrack::new()), constraint),
                TrackKind::Section => scene.add_boxed_track(
                    Box::new(SectionTrack::new(spec.sections.clone())),
                    constraint,
                ),
                TrackKind::Image => scene.add_boxed_track(
                    Box::new(ImageTrack::new(spec.images.clone())),
                    constraint,
                ),
            };
            if let Some(track) = scene.track_mut(id) {
                for (key, value) in &spec.parameters {
                    track.set_parameter(key, &value_text(value));
                }
            }
        }
        scene
    }
}

/// Parameter text for a TOML value; strings lose their quotes.
fn value_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Plain relative filesystem paths; URLs and absolute paths are left alone.
fn is_relative_path(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.scheme().len() > 1 => false,
        _ => Path::new(url).is_relative(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Origin;
    use crate::units::Unit;

    const SCENE: &str = r#"
        [scene]
        origin = "base"
        scale = 25
        units = "ft"
        note = "kept"

        [[tracks]]
        kind = "ruler"
        width = 40

        [[tracks]]
        kind = "section"
        width = "*"
        parameters = { title = "Boxes" }
        sections = [
            { name = "B1", top = "0 ft", base = "3 ft" },
            { name = "B2", top = "3 ft", base = "6 ft" },
        ]

        [[tracks]]
        kind = "image"
        images = [{ url = "scans/b1.png", top = "0 ft", base = "3 ft" }]
    "#;

    #[test]
    fn builds_tracks_and_parameters() {
        let file: SceneFile = toml::from_str(SCENE).unwrap();
        let mut scene = file.build(&Config::default());
        assert_eq!(scene.origin(), Origin::Base);
        assert_eq!(scene.scale(), 25.0);
        assert_eq!(scene.units(), Unit::Foot);
        assert_eq!(scene.parameter("note").as_deref(), Some("kept"));

        let ids = scene.track_ids();
        assert_eq!(ids.len(), 3);
        assert_eq!(scene.constraint(ids[0]), Some("40"));
        assert_eq!(scene.constraint(ids[1]), Some("*"));
        assert_eq!(scene.constraint(ids[2]), None);
        assert_eq!(scene.track(ids[1]).unwrap().title(), "Boxes");
        assert_eq!(scene.content_height(), 150.0);
    }

    #[test]
    fn relative_image_paths_follow_the_scene_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.toml");
        fs::write(&path, SCENE).unwrap();
        let file = SceneFile::load(&path).unwrap();
        let url = &file.tracks[2].images[0].url;
        assert_eq!(Path::new(url), dir.path().join("scans/b1.png"));
    }

    #[test]
    fn urls_and_absolute_paths_are_untouched() {
        assert!(!is_relative_path("https://example.com/a.png"));
        assert!(!is_relative_path("/data/a.png"));
        assert!(is_relative_path("a.png"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[[tracks]]\nkind = \"spiral\"\n").unwrap();
        let err = SceneFile::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }
}
