//! Static texture loading (spec.md §4.4): decodes PNG/JPEG bytes via `image`, uploads an RGBA8
//! `wgpu` texture, and owns a sampler. Grounded on the teacher's `TextureManager` usage pattern
//! inferred from its compute/render pipelines: nearest-filtered, clamp-to-edge, created once at
//! load time and updated in place for dynamic sources (video, camera).

use crate::error::{EngineError, Result};
use std::path::PathBuf;
use wgpu::util::DeviceExt;

/// A GPU-resident RGBA8 2D texture plus the view used to bind it.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    /// Decodes `bytes` (PNG or JPEG) and uploads them as an RGBA8 texture.
    pub fn from_encoded_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &str,
        bytes: &[u8],
    ) -> Result<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| EngineError::ImageDecode {
            path: PathBuf::from(path),
            message: e.to_string(),
        })?;
        let rgba = img.to_rgba8();
        Ok(Self::from_rgba(device, queue, &rgba, Some(path)))
    }

    /// Uploads an already-decoded RGBA8 image (used by the video/camera pipeline, which produces
    /// raw frames rather than encoded bytes).
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &image::RgbaImage,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label,
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            image.as_raw(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view, width, height }
    }

    /// Overwrites the texture's contents in place, growing it first if the new frame's
    /// dimensions differ (video/camera sources may change size across a hot reload).
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, image: &image::RgbaImage) {
        let (w, h) = image.dimensions();
        if w != self.width || h != self.height {
            *self = Self::from_rgba(device, queue, image, None);
            return;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );
    }
}

/// The single sampler shared by every texture in group 0 (spec.md §4.5): nearest filtering,
/// clamp-to-edge, matching the dialect's pixel-art-first defaults.
pub fn create_shared_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("shared_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
