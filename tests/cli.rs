use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCENE: &str = r#"
[scene]
scale = 40

[[tracks]]
kind = "ruler"

[[tracks]]
kind = "section"
width = "*"
sections = [
    { name = "B1", top = "0 m", base = "1.5 m" },
    { name = "B2", top = "1.5 m", base = "3 m" },
]
"#;

fn corescope_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("corescope").expect("binary exists");
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_CACHE_HOME", home.join("cache"));
    cmd
}

fn write_scene(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("scene.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn corescope_help_prints_usage() {
    let temp = TempDir::new().unwrap();
    corescope_cmd(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Render core-sample tracks"));
}

#[test]
fn render_requires_output() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(temp.path(), SCENE);
    corescope_cmd(temp.path())
        .arg("render")
        .arg(&scene)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "required arguments were not provided",
        ));
}

#[test]
fn render_png_writes_an_image() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(temp.path(), SCENE);
    let output = temp.path().join("out.png");

    corescope_cmd(temp.path())
        .arg("render")
        .arg(&scene)
        .arg("-o")
        .arg(&output)
        .args(["--width", "300"])
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"), "not a PNG file");
}

#[test]
fn render_pdf_paginates() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(temp.path(), SCENE);
    let output = temp.path().join("log.pdf");

    corescope_cmd(temp.path())
        .arg("render")
        .arg(&scene)
        .arg("--output")
        .arg(&output)
        .args(["--units-per-page", "1 m"])
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn explicit_format_overrides_extension() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(temp.path(), SCENE);
    let output = temp.path().join("canvas.out");

    corescope_cmd(temp.path())
        .arg("render")
        .arg(&scene)
        .arg("-o")
        .arg(&output)
        .args(["--format", "js"])
        .assert()
        .success();

    let script = fs::read_to_string(&output).unwrap();
    assert!(script.contains("getContext"));
    assert!(script.contains("B1"));
}

#[test]
fn unknown_extension_needs_a_format() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(temp.path(), SCENE);

    corescope_cmd(temp.path())
        .arg("render")
        .arg(&scene)
        .arg("-o")
        .arg(temp.path().join("out.bin"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot infer the output format"));
}

#[test]
fn missing_scene_file_fails() {
    let temp = TempDir::new().unwrap();

    corescope_cmd(temp.path())
        .arg("render")
        .arg(temp.path().join("absent.toml"))
        .arg("-o")
        .arg(temp.path().join("out.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read scene file"));
}

#[test]
fn empty_scene_is_rejected_for_raster_output() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(temp.path(), "[scene]\nscale = 10\n");

    corescope_cmd(temp.path())
        .arg("render")
        .arg(&scene)
        .arg("-o")
        .arg(temp.path().join("out.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Scene is empty"));
}

#[test]
fn init_config_writes_example_once() {
    let temp = TempDir::new().unwrap();
    let expected = temp.path().join("config/corescope/config.toml");

    corescope_cmd(temp.path())
        .arg("init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
    assert!(expected.exists());

    corescope_cmd(temp.path())
        .arg("init-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
