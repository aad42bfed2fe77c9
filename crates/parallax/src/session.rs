//! Assembles a [`RenderLoop`] from a [`RendererConfig`] and drives it
//! without a window.

use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;

use crate::layers::LayerStack;
use crate::render_loop::{RenderLoop, StopHandle};
use crate::runtime::FramePacer;
use crate::scene::Scene;
use crate::software::SoftwareCompositor;
use crate::textures::{AssetLoader, TextureSet};
use crate::types::RendererConfig;

/// A render loop plus the worker still decoding its textures.
pub struct SceneSession {
    render_loop: RenderLoop,
    loader: Option<JoinHandle<()>>,
}

impl SceneSession {
    /// Registers every configured image, starts decoding them in the
    /// background and builds the loop around the (still pending) textures.
    pub fn spawn(config: &RendererConfig) -> Result<Self> {
        let mask_label = config
            .mask
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "mask".to_string());
        let mut textures = TextureSet::new(mask_label);
        let mut jobs = Vec::with_capacity(config.images.len() + 1);
        if let Some(mask) = &config.mask {
            jobs.push((textures.mask(), mask.clone()));
        }
        for image in &config.images {
            let handle = textures.add_base(image.display().to_string());
            jobs.push((handle, image.clone()));
        }

        let loader = AssetLoader::new();
        let worker = if jobs.is_empty() {
            tracing::warn!("no images configured; the scene will stay empty");
            None
        } else {
            Some(loader.spawn(jobs).context("failed to start texture loader")?)
        };

        let tuning = &config.tuning;
        let layers = LayerStack::build(textures, tuning.layout);
        let mut scene = Scene::new(tuning.camera, layers);
        scene
            .camera
            .set_viewport(config.surface_size.0, config.surface_size.1);
        let effects = tuning
            .effect_chain()
            .context("failed to build effect chain")?;

        let render_loop = RenderLoop::new(scene, effects, tuning.clock)
            .with_pointer(tuning.pointer_tracker())
            .with_texture_loads(loader.receiver().clone());

        Ok(Self {
            render_loop,
            loader: worker,
        })
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn render_loop_mut(&mut self) -> &mut RenderLoop {
        &mut self.render_loop
    }

    pub fn into_render_loop(self) -> RenderLoop {
        self.render_loop
    }

    /// Blocks until every texture has been decoded. Results are applied on
    /// the next tick.
    pub fn wait_for_assets(&mut self) -> Result<()> {
        if let Some(worker) = self.loader.take() {
            worker
                .join()
                .map_err(|err| anyhow!("texture loader panicked: {err:?}"))?;
        }
        Ok(())
    }
}

/// Parameters for a headless render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Number of ticks to run; the last one is returned.
    pub frames: u64,
    /// Start the transition animation before the first tick.
    pub animate: bool,
    pub size: (u32, u32),
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            frames: 1,
            animate: false,
            size: (1280, 720),
        }
    }
}

/// Runs the scene on the software compositor and returns the last frame.
pub fn render_offscreen(config: &RendererConfig, options: ExportOptions) -> Result<RgbaImage> {
    if options.frames == 0 {
        anyhow::bail!("export needs at least one frame");
    }
    let (width, height) = options.size;
    let stop = StopHandle::new();
    let mut compositor = SoftwareCompositor::new(width, height)?
        .with_frame_budget(options.frames, stop.clone());

    let mut session = SceneSession::spawn(config)?;
    session.wait_for_assets()?;
    let render_loop = session.render_loop_mut();
    render_loop.resize(width, height);
    if options.animate {
        render_loop.play();
    }

    let mut pacer = FramePacer::uncapped();
    let frames = render_loop.run_until_stopped(&mut compositor, &mut pacer, &stop);
    tracing::debug!(frames, width, height, "headless render finished");

    compositor
        .take_frame()
        .ok_or_else(|| anyhow!("no frame was presented"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::Rgba;

    use super::*;

    #[test]
    fn render_without_images_is_black() {
        let frame = render_offscreen(
            &RendererConfig::default(),
            ExportOptions {
                frames: 2,
                animate: false,
                size: (8, 6),
            },
        )
        .expect("render");
        assert_eq!(frame.dimensions(), (8, 6));
        assert!(frame.pixels().all(|pixel| *pixel == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn zero_frames_is_rejected() {
        let options = ExportOptions {
            frames: 0,
            ..Default::default()
        };
        assert!(render_offscreen(&RendererConfig::default(), options).is_err());
    }

    #[test]
    fn missing_image_degrades_to_black() {
        let config = RendererConfig {
            images: vec![PathBuf::from("/nonexistent/parallax-missing.png")],
            ..Default::default()
        };
        let frame = render_offscreen(
            &config,
            ExportOptions {
                frames: 1,
                animate: true,
                size: (4, 4),
            },
        )
        .expect("render");
        assert!(frame.pixels().all(|pixel| *pixel == Rgba([0, 0, 0, 255])));
    }
}
