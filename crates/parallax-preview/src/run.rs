use std::path::Path;

use anyhow::{anyhow, Context, Result};
use parallax::{render_offscreen, ExportOptions};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::bindings::{load_preset, renderer_config, WindowOptions};
use crate::cli::{check_export_path, ExportArgs, RunArgs};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the interactive window preview.
pub fn run(args: RunArgs) -> Result<()> {
    let config = renderer_config(
        &args.scene,
        WindowOptions {
            size: args.size,
            fps: args.fps,
            vsync: !args.no_vsync,
            color_space: args.color_space,
        },
    )?;
    if config.images.is_empty() {
        tracing::warn!("no images given; pass --image or a preset with [assets] images");
    }
    tracing::info!(
        images = config.images.len(),
        size = ?config.surface_size,
        fps = ?config.target_fps,
        vsync = config.vsync,
        color_space = %config.color_space,
        "starting parallax preview"
    );
    parallax::run_window(config)
}

/// Renders headlessly and writes the last frame.
pub fn export(args: ExportArgs) -> Result<()> {
    check_export_path(&args.output).map_err(|err| anyhow!(err))?;
    let mut config = renderer_config(&args.scene, WindowOptions::default())?;
    config.surface_size = args.size;

    let options = ExportOptions {
        frames: args.frames,
        animate: args.animate,
        size: args.size,
    };
    tracing::info!(
        frames = options.frames,
        animate = options.animate,
        size = ?options.size,
        output = %args.output.display(),
        "rendering headless export"
    );
    let frame = render_offscreen(&config, options)?;
    frame
        .save_with_format(&args.output, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    tracing::info!(output = %args.output.display(), "export written");
    Ok(())
}

/// Validates a preset and prints what it resolves to.
pub fn check_config(path: &Path) -> Result<()> {
    let preset = load_preset(path)?;
    let summary = json!({
        "version": preset.version,
        "images": preset.assets.images,
        "mask": preset.assets.mask,
        "planes_per_group": preset.layers.planes_per_group,
        "timeline_step_ms": preset.clock.timeline_step.as_secs_f64() * 1000.0,
        "fps": preset.clock.fps,
        "camera": preset.camera,
        "effects": preset.effects,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
