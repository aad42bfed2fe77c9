//! Maps scene presets and CLI flags onto the renderer's configuration types.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use parallax::{
    Camera, ColorSpaceMode, CurtainTuning, LoopTuning, RendererConfig, RgbSplitTuning,
    SceneTuning, StackLayout,
};
use sceneconfig::ScenePreset;

use crate::cli::SceneArgs;

pub fn load_preset(path: &Path) -> Result<ScenePreset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read preset {}", path.display()))?;
    ScenePreset::from_toml_str(&raw)
        .with_context(|| format!("failed to load preset {}", path.display()))
}

/// Joins relative asset paths onto the directory holding the preset.
fn resolve_asset(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn scene_tuning(preset: &ScenePreset) -> SceneTuning {
    let layers = &preset.layers;
    let camera = &preset.camera;
    let effects = &preset.effects;
    SceneTuning {
        layout: StackLayout {
            planes_per_group: layers.planes_per_group,
            depth_spacing: layers.depth_spacing,
            group_spacing: layers.group_spacing,
            plane_size: Vec2::from_array(layers.plane_size),
            tilt: layers.tilt,
            amplitude: layers.amplitude,
        },
        camera: Camera::new(
            Vec3::from_array(camera.position),
            camera.fov,
            camera.near,
            camera.far,
        ),
        pointer_bias: Vec2::from_array(preset.pointer.bias),
        smoothing: preset.pointer.smoothing,
        clock: LoopTuning {
            time_step: preset.clock.time_step,
            oscillator_frequency: preset.clock.oscillator_frequency,
            timeline_step: preset.clock.timeline_step.as_secs_f32(),
        },
        curtain: CurtainTuning {
            strips: effects.curtain_strips,
            stagger: effects.curtain_stagger,
        },
        rgb_split: RgbSplitTuning {
            amount: effects.rgb_amount,
            direction: Vec2::from_array(effects.rgb_direction),
        },
    }
}

/// Presentation flags that only apply to the window preview.
#[derive(Debug, Clone, Copy)]
pub struct WindowOptions {
    pub size: Option<(u32, u32)>,
    pub fps: Option<f32>,
    pub vsync: bool,
    pub color_space: ColorSpaceMode,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            size: None,
            fps: None,
            vsync: true,
            color_space: ColorSpaceMode::Auto,
        }
    }
}

/// Builds the renderer configuration. Flags win over the preset; `--image`
/// replaces the preset's image list rather than extending it.
pub fn renderer_config(scene: &SceneArgs, window: WindowOptions) -> Result<RendererConfig> {
    let mut config = RendererConfig::default();
    let mut preset_fps = None;

    if let Some(path) = &scene.config {
        let preset = load_preset(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.images = preset
            .assets
            .images
            .iter()
            .map(|image| resolve_asset(base, image))
            .collect();
        config.mask = preset
            .assets
            .mask
            .as_deref()
            .map(|mask| resolve_asset(base, mask));
        config.tuning = scene_tuning(&preset);
        preset_fps = preset.clock.fps;
        tracing::debug!(
            preset = %path.display(),
            images = config.images.len(),
            masked = config.mask.is_some(),
            "loaded scene preset"
        );
    }

    if !scene.images.is_empty() {
        config.images = scene.images.clone();
    }
    if let Some(mask) = &scene.mask {
        config.mask = Some(mask.clone());
    }

    if let Some(size) = window.size {
        config.surface_size = size;
    }
    config.target_fps = match window.fps.or(preset_fps) {
        Some(fps) if fps > 0.0 => Some(fps),
        _ => None,
    };
    config.vsync = window.vsync;
    config.color_space = window.color_space;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_preset(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("scene.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn relative_assets_resolve_against_preset_dir() {
        let dir = tempfile::tempdir().unwrap();
        let preset = write_preset(
            dir.path(),
            r#"
version = 1
[assets]
images = ["img/a.png", "/abs/b.png"]
mask = "img/mask.png"
"#,
        );
        let scene = SceneArgs {
            config: Some(preset),
            ..Default::default()
        };
        let config = renderer_config(&scene, WindowOptions::default()).unwrap();
        assert_eq!(
            config.images,
            vec![dir.path().join("img/a.png"), PathBuf::from("/abs/b.png")]
        );
        assert_eq!(config.mask, Some(dir.path().join("img/mask.png")));
    }

    #[test]
    fn flags_override_preset() {
        let dir = tempfile::tempdir().unwrap();
        let preset = write_preset(
            dir.path(),
            r#"
version = 1
[assets]
images = ["a.png"]
[clock]
fps = 30
"#,
        );
        let scene = SceneArgs {
            config: Some(preset),
            images: vec![PathBuf::from("other.png")],
            mask: None,
        };
        let config = renderer_config(
            &scene,
            WindowOptions {
                fps: Some(0.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.images, vec![PathBuf::from("other.png")]);
        assert_eq!(config.target_fps, None);
    }

    #[test]
    fn preset_fps_applies_without_flag() {
        let dir = tempfile::tempdir().unwrap();
        let preset = write_preset(dir.path(), "version = 1\n[clock]\nfps = 24\n");
        let scene = SceneArgs {
            config: Some(preset),
            ..Default::default()
        };
        let config = renderer_config(&scene, WindowOptions::default()).unwrap();
        assert_eq!(config.target_fps, Some(24.0));
    }

    #[test]
    fn tuning_follows_preset_values() {
        let preset = ScenePreset::from_toml_str(
            r#"
version = 1
[layers]
planes_per_group = 5
[clock]
timeline_step = "10ms"
[effects]
curtain_strips = 4
"#,
        )
        .unwrap();
        let tuning = scene_tuning(&preset);
        assert_eq!(tuning.layout.planes_per_group, 5);
        assert!((tuning.clock.timeline_step - 0.01).abs() < 1e-6);
        assert_eq!(tuning.curtain.strips, 4.0);
        assert_eq!(tuning.camera.position, Vec3::new(0.0, 0.0, 900.0));
    }

    #[test]
    fn missing_preset_reports_path() {
        let scene = SceneArgs {
            config: Some(PathBuf::from("/nonexistent/scene.toml")),
            ..Default::default()
        };
        let err = renderer_config(&scene, WindowOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/scene.toml"));
    }
}
