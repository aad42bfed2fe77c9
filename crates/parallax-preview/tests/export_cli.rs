use std::fs;
use std::process::Command;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

#[test]
fn export_writes_last_frame() {
    let root = TempDir::new().unwrap();
    let base = root.path().join("red.png");
    RgbaImage::from_pixel(16, 9, Rgba([255, 0, 0, 255]))
        .save(&base)
        .unwrap();
    let output = root.path().join("frame.png");

    let status = Command::new(env!("CARGO_BIN_EXE_parallax-preview"))
        .env("RUST_LOG", "off")
        .arg("export")
        .arg("--image")
        .arg(&base)
        .args(["--frames", "3", "--size", "32x18", "--output"])
        .arg(&output)
        .status()
        .expect("failed to run parallax-preview export");

    assert!(status.success());
    let frame = image::open(&output).expect("decode export").to_rgba8();
    assert_eq!(frame.dimensions(), (32, 18));
    assert_eq!(*frame.get_pixel(16, 9), Rgba([255, 0, 0, 255]));
}

#[test]
fn export_resolves_preset_assets() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("img")).unwrap();
    RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]))
        .save(root.path().join("img/blue.png"))
        .unwrap();
    let preset = root.path().join("scene.toml");
    fs::write(&preset, "version = 1\n[assets]\nimages = [\"img/blue.png\"]\n").unwrap();
    let output = root.path().join("frame.png");

    let status = Command::new(env!("CARGO_BIN_EXE_parallax-preview"))
        .env("RUST_LOG", "off")
        .arg("export")
        .arg("--config")
        .arg(&preset)
        .args(["--size", "20x10", "--output"])
        .arg(&output)
        .status()
        .expect("failed to run parallax-preview export");

    assert!(status.success());
    let frame = image::open(&output).expect("decode export").to_rgba8();
    assert_eq!(*frame.get_pixel(10, 5), Rgba([0, 0, 255, 255]));
}

#[test]
fn export_rejects_non_png_output() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("frame.jpg");

    let status = Command::new(env!("CARGO_BIN_EXE_parallax-preview"))
        .env("RUST_LOG", "off")
        .args(["export", "--output"])
        .arg(&output)
        .status()
        .expect("failed to run parallax-preview export");

    assert!(!status.success());
    assert!(!output.exists());
}
