use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::textures::{TextureHandle, TextureSet};

use super::context::SurfaceColorSpace;

pub(crate) struct GpuTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// GPU copies of the ready slots of a [`TextureSet`], indexed by handle.
pub(crate) struct GpuTextures {
    uploaded: Vec<Option<GpuTexture>>,
    placeholder: GpuTexture,
    format: wgpu::TextureFormat,
}

impl GpuTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, color_space: SurfaceColorSpace) -> Self {
        let format = color_space.texture_format();
        let placeholder = upload(
            device,
            queue,
            "placeholder texture",
            1,
            1,
            &[255u8, 255, 255, 255],
            format,
        );
        Self {
            uploaded: Vec::new(),
            placeholder,
            format,
        }
    }

    /// Uploads every slot that became ready since the last call. Returns
    /// the number of new uploads.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, set: &TextureSet) -> usize {
        if self.uploaded.len() < set.len() {
            self.uploaded.resize_with(set.len(), || None);
        }
        let max_dimension = device.limits().max_texture_dimension_2d;
        let mut uploads = 0;
        for handle in set.handles() {
            let index = handle.index();
            if self.uploaded[index].is_some() {
                continue;
            }
            let Some(image) = set.image(handle) else {
                continue;
            };
            let label = set.label(handle).unwrap_or("texture");
            let image = fit_to_limit(image, max_dimension, label);
            let (width, height) = image.dimensions();
            self.uploaded[index] = Some(upload(
                device,
                queue,
                label,
                width,
                height,
                image.as_raw(),
                self.format,
            ));
            tracing::debug!(label, width, height, "uploaded texture");
            uploads += 1;
        }
        uploads
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.uploaded.get(handle.index()).and_then(Option::as_ref)
    }

    /// Bound in place of the mask for opaque planes.
    pub fn placeholder(&self) -> &GpuTexture {
        &self.placeholder
    }
}

/// Downscales images that exceed the device limit.
fn fit_to_limit<'a>(
    image: &'a RgbaImage,
    max_dimension: u32,
    label: &str,
) -> std::borrow::Cow<'a, RgbaImage> {
    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return std::borrow::Cow::Borrowed(image);
    }
    let scale = max_dimension as f32 / width.max(height) as f32;
    let target_w = ((width as f32 * scale) as u32).max(1);
    let target_h = ((height as f32 * scale) as u32).max(1);
    tracing::warn!(
        label,
        width,
        height,
        max_dimension,
        "texture exceeds GPU limit; downscaling"
    );
    std::borrow::Cow::Owned(image::imageops::resize(
        image,
        target_w,
        target_h,
        image::imageops::FilterType::Triangle,
    ))
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    data: &[u8],
    format: wgpu::TextureFormat,
) -> GpuTexture {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        _texture: texture,
        view,
    }
}
