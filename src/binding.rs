//! Binding Planner (spec.md §4.5): derives the three `wgpu` bind group layouts from a
//! [`ProgramManifest`], matching the `@group`/`@binding` numbers the preprocessor already baked
//! into the generated WGSL.

use crate::manifest::ProgramManifest;
use wgpu::{BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, Device};

/// Group 0: one sampler, then one `texture_2d<f32>` per static texture, video, and camera, in
/// that fixed order.
pub fn group0_layout(device: &Device, manifest: &ProgramManifest) -> BindGroupLayout {
    let mut entries = vec![BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }];
    for i in 0..manifest.total_fragment_textures() {
        entries.push(BindGroupLayoutEntry {
            binding: 1 + i as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
    }
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("group0_textures"),
        entries: &entries,
    })
}

/// Group 1: the single host block storage buffer, readable and writable from the fragment and
/// compute stages.
pub fn group1_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("group1_host_block"),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
            ty: BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Group 2: two read-only storage buffers (positions, normals) per model, in manifest order.
pub fn group2_layout(device: &Device, manifest: &ProgramManifest) -> BindGroupLayout {
    let mut entries = Vec::with_capacity(2 * manifest.models.len());
    for i in 0..manifest.models.len() {
        entries.push(BindGroupLayoutEntry {
            binding: 1 + 2 * i as u32,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        entries.push(BindGroupLayoutEntry {
            binding: 2 + 2 * i as u32,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
    }
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("group2_models"),
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Binding numbers must match what `preprocess::build_header` emits into the WGSL source,
    /// independent of any `wgpu::Device` — this just checks the arithmetic both sides share.
    #[test]
    fn texture_binding_numbers_follow_textures_then_videos_then_cameras() {
        let mut manifest = ProgramManifest::new();
        manifest.textures = vec!["a.png".into(), "b.png".into()];
        manifest.videos = vec!["clip.mp4".into()];
        manifest.cameras = vec![0];
        assert_eq!(manifest.total_fragment_textures(), 4);
        // binding 0 = sampler, 1..=2 textures, 3 video, 4 camera
        let video_base = manifest.textures.len();
        let camera_base = video_base + manifest.videos.len();
        assert_eq!(video_base, 2);
        assert_eq!(camera_base, 3);
    }

    #[test]
    fn model_bindings_are_two_per_model() {
        let mut manifest = ProgramManifest::new();
        manifest.models = vec!["bunny.obj".into(), "cube.obj".into()];
        // model 0: bindings 1,2; model 1: bindings 3,4
        for i in 0..manifest.models.len() {
            let pos_binding = 1 + 2 * i as u32;
            let norm_binding = 2 + 2 * i as u32;
            assert_eq!(norm_binding, pos_binding + 1);
        }
    }
}
