use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use parallax::{render_offscreen, ExportOptions, RendererConfig};
use tempfile::TempDir;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn solid(dir: &Path, name: &str, color: Rgba<u8>) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(8, 8, color).save(&path).unwrap();
    path
}

fn two_groups(dir: &Path) -> RendererConfig {
    RendererConfig {
        images: vec![solid(dir, "red.png", RED), solid(dir, "blue.png", BLUE)],
        ..Default::default()
    }
}

fn center(config: &RendererConfig, frames: u64, animate: bool) -> Rgba<u8> {
    let frame = render_offscreen(
        config,
        ExportOptions {
            frames,
            animate,
            size: (16, 9),
        },
    )
    .expect("render");
    *frame.get_pixel(8, 4)
}

#[test]
fn idle_scene_shows_first_group() {
    let dir = TempDir::new().unwrap();
    assert_eq!(center(&two_groups(dir.path()), 3, false), RED);
}

#[test]
fn curtain_covers_view_at_animation_midpoint() {
    let dir = TempDir::new().unwrap();
    assert_eq!(center(&two_groups(dir.path()), 60, true), BLACK);
}

#[test]
fn finished_animation_lands_on_second_group() {
    let dir = TempDir::new().unwrap();
    assert_eq!(center(&two_groups(dir.path()), 140, true), BLUE);
}

#[test]
fn opaque_mask_shows_front_planes() {
    let dir = TempDir::new().unwrap();
    let config = RendererConfig {
        images: vec![solid(dir.path(), "red.png", RED)],
        mask: Some(solid(dir.path(), "mask.png", Rgba([0, 255, 0, 255]))),
        ..Default::default()
    };
    assert_eq!(center(&config, 2, false), RED);
}
