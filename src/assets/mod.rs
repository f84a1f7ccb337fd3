//! Asset pipeline (spec.md §4.4): loads every resource a [`crate::manifest::ProgramManifest`]
//! names into GPU-ready form, keyed by the manifest's own ordering so binding indices line up
//! with the generated WGSL without any further lookup.

pub mod audio;
pub mod obj;
pub mod texture;
pub mod video;

use crate::error::Result;
use crate::manifest::ProgramManifest;
use crate::resolver::FileResolver;
use texture::GpuTexture;
use video::VideoSource;

/// Every loaded resource a manifest named, ready to be bound into the three bind groups.
pub struct AssetSet {
    pub static_textures: Vec<GpuTexture>,
    pub videos: Vec<VideoSource>,
    pub cameras: Vec<VideoSource>,
    pub models: Vec<obj::Model>,
    pub sounds: Vec<audio::SoundClip>,
}

impl AssetSet {
    /// Loads every asset the manifest names, in manifest order, failing on the first error
    /// (spec.md §7: a missing asset is a startup error, not a soft failure).
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        resolver: &dyn FileResolver,
        manifest: &ProgramManifest,
    ) -> Result<Self> {
        let mut static_textures = Vec::with_capacity(manifest.textures.len());
        for path in &manifest.textures {
            let bytes = resolver.read_bytes(path)?;
            static_textures.push(texture::GpuTexture::from_encoded_bytes(device, queue, path, &bytes)?);
        }

        // Video and camera sources are optional assets: a failure to open them degrades to a
        // static 1x1 black texture rather than aborting the whole load (spec.md §7).
        let mut videos = Vec::with_capacity(manifest.videos.len());
        for path in &manifest.videos {
            videos.push(video::VideoSource::from_file(device, queue, resolver, path).unwrap_or_else(|e| {
                log::warn!("video `{path}` failed to open, using a black placeholder: {e}");
                video::VideoSource::placeholder(device, queue)
            }));
        }

        let mut cameras = Vec::with_capacity(manifest.cameras.len());
        for device_index in &manifest.cameras {
            cameras.push(video::VideoSource::from_camera(device, queue, *device_index).unwrap_or_else(|e| {
                log::warn!("camera {device_index} failed to open, using a black placeholder: {e}");
                video::VideoSource::placeholder(device, queue)
            }));
        }

        let mut models = Vec::with_capacity(manifest.models.len());
        for path in &manifest.models {
            let text = resolver.read_text(path)?;
            models.push(obj::parse_obj(&text, path)?);
        }

        let mut sounds = Vec::with_capacity(manifest.sounds.len());
        for path in &manifest.sounds {
            let bytes = resolver.read_bytes(path)?;
            sounds.push(audio::SoundClip::decode(path, bytes)?);
        }

        Ok(Self { static_textures, videos, cameras, models, sounds })
    }
}
