//! Image slots for the layer stack and their background decoding.
//!
//! A [`TextureSet`] hands out handles up front; [`AssetLoader`] decodes the
//! files on a worker thread and the render loop applies the results with
//! [`TextureSet::poll`]. Slots that are pending or failed stay unready.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::RgbaImage;

use crate::error::RenderError;

/// Opaque reference to an image slot in a [`TextureSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Load state of a texture slot. `Ready` images are never mutated again.
#[derive(Clone, Debug)]
pub enum TextureState {
    Pending,
    Ready(Arc<RgbaImage>),
    Failed,
}

impl TextureState {
    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            TextureState::Ready(image) => Some(image.as_ref()),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TextureState::Ready(_))
    }
}

#[derive(Clone, Debug)]
struct TextureSlot {
    label: String,
    state: TextureState,
}

/// All images used by the layer stack: one base per group plus the shared
/// alpha mask.
#[derive(Clone, Debug)]
pub struct TextureSet {
    slots: Vec<TextureSlot>,
    bases: Vec<TextureHandle>,
    mask: TextureHandle,
}

impl TextureSet {
    /// Creates a set whose only slot is the alpha mask.
    pub fn new(mask_label: impl Into<String>) -> Self {
        Self {
            slots: vec![TextureSlot {
                label: mask_label.into(),
                state: TextureState::Pending,
            }],
            bases: Vec::new(),
            mask: TextureHandle(0),
        }
    }

    pub fn add_base(&mut self, label: impl Into<String>) -> TextureHandle {
        let handle = TextureHandle(self.slots.len() as u32);
        self.slots.push(TextureSlot {
            label: label.into(),
            state: TextureState::Pending,
        });
        self.bases.push(handle);
        handle
    }

    pub fn bases(&self) -> &[TextureHandle] {
        &self.bases
    }

    pub fn mask(&self) -> TextureHandle {
        self.mask
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn label(&self, handle: TextureHandle) -> Option<&str> {
        self.slots.get(handle.index()).map(|slot| slot.label.as_str())
    }

    pub fn state(&self, handle: TextureHandle) -> Option<&TextureState> {
        self.slots.get(handle.index()).map(|slot| &slot.state)
    }

    pub fn image(&self, handle: TextureHandle) -> Option<&RgbaImage> {
        self.state(handle).and_then(TextureState::image)
    }

    pub fn handles(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        (0..self.slots.len() as u32).map(TextureHandle)
    }

    /// Stores a decoded image. A slot that already resolved keeps its
    /// first result.
    pub fn resolve(&mut self, handle: TextureHandle, image: RgbaImage) {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            tracing::warn!(index = handle.index(), "texture result for unknown slot ignored");
            return;
        };
        if !matches!(slot.state, TextureState::Pending) {
            tracing::debug!(label = %slot.label, "texture already resolved; ignoring reload");
            return;
        }
        slot.state = TextureState::Ready(Arc::new(image));
    }

    /// Marks a slot as failed; it keeps rendering as an unready texture.
    pub fn fail(&mut self, handle: TextureHandle, error: &RenderError) {
        if let Some(slot) = self.slots.get_mut(handle.index()) {
            tracing::warn!(
                label = %slot.label,
                error = %error,
                "failed to load texture; continuing with placeholder"
            );
            if matches!(slot.state, TextureState::Pending) {
                slot.state = TextureState::Failed;
            }
        }
    }

    /// Applies every load result that has arrived so far.
    pub fn poll(&mut self, loads: &Receiver<LoadedTexture>) -> usize {
        let mut applied = 0;
        for loaded in loads.try_iter() {
            match loaded.result {
                Ok(image) => self.resolve(loaded.handle, image),
                Err(error) => self.fail(loaded.handle, &error),
            }
            applied += 1;
        }
        applied
    }
}

/// Result of decoding one texture slot.
#[derive(Debug)]
pub struct LoadedTexture {
    pub handle: TextureHandle,
    pub result: Result<RgbaImage, RenderError>,
}

/// Decodes image files off the render thread.
pub struct AssetLoader {
    sender: Sender<LoadedTexture>,
    receiver: Receiver<LoadedTexture>,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn receiver(&self) -> &Receiver<LoadedTexture> {
        &self.receiver
    }

    /// Spawns one worker that decodes `jobs` in order and reports each result.
    pub fn spawn(&self, jobs: Vec<(TextureHandle, PathBuf)>) -> Result<thread::JoinHandle<()>> {
        let sender = self.sender.clone();
        thread::Builder::new()
            .name("parallax-assets".into())
            .spawn(move || {
                for (handle, path) in jobs {
                    let result = decode_image(&path);
                    if sender.send(LoadedTexture { handle, result }).is_err() {
                        tracing::debug!("texture receiver dropped; stopping asset worker");
                        break;
                    }
                }
            })
            .map_err(|err| anyhow!("failed to spawn asset loader thread: {err}"))
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn decode_image(path: &Path) -> Result<RgbaImage, RenderError> {
    let image = image::open(path).map_err(|source| RenderError::AssetLoad {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded texture"
    );
    Ok(image.to_rgba8())
}
