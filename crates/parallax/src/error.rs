use std::path::PathBuf;

/// Failures surfaced by the layer/effect pipeline.
///
/// Only [`RenderError::MissingSurface`] is fatal at construction time; the
/// render loop logs every other variant and keeps scheduling frames.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no render surface to draw into: {reason}")]
    MissingSurface { reason: String },
    #[error("render pass must be the first pass in the chain (got {kind} at index {index})")]
    PassOrder { kind: &'static str, index: usize },
    #[error("effect chain has no render pass")]
    EmptyChain,
    #[error("failed to load texture {path}: {source}")]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("surface error: {0:?}")]
    Surface(wgpu::SurfaceError),
    #[error("frame was not started before pass {0}")]
    FrameNotStarted(usize),
}

impl RenderError {
    pub fn missing_surface(reason: impl Into<String>) -> Self {
        RenderError::MissingSurface {
            reason: reason.into(),
        }
    }

    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            RenderError::Surface(err) => Some(err),
            _ => None,
        }
    }
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(value: wgpu::SurfaceError) -> Self {
        RenderError::Surface(value)
    }
}
