//! Frame Scheduler (spec.md §4.7): the fixed nine-step per-frame protocol shared by every
//! program, regardless of what its `GameState` or WGSL entry points look like.

use crate::assets::audio::AudioOutput;
use crate::assets::AssetSet;
use crate::binding;
use crate::error::{EngineError, Result};
use crate::hostblock::HostBlock;
use crate::manifest::ProgramManifest;
use crate::osc::{OscListener, OscTarget};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Everything the scheduler needs to drive one program, built once at load/reload time.
pub struct GpuProgram {
    pub host_buffer: wgpu::Buffer,
    pub audio_staging_buffer: Option<wgpu::Buffer>,
    pub group0: wgpu::BindGroup,
    pub group1: wgpu::BindGroup,
    pub group2: wgpu::BindGroup,
    pub compute_pipeline: wgpu::ComputePipeline,
    pub render_pipeline: wgpu::RenderPipeline,
    depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
}

/// The format required for the dialect's depth buffer (spec.md line 134: "24-bit depth,
/// less-compare, enabled").
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// A 16-byte-aligned 3D vector, matching the model buffers' std430 layout (spec.md §3: the fourth
/// lane is padding, zero).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct PaddedVec3 {
    xyz: [f32; 3],
    _pad: f32,
}

impl GpuProgram {
    /// Builds every GPU resource a program needs: the host block buffer, the audio staging
    /// buffer (only if the program has sounds), the three bind groups, and the compute/render
    /// pipelines compiled from `manifest.generated_wgsl` (spec.md §4.5, §4.6, §4.7).
    pub fn build(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        manifest: &ProgramManifest,
        assets: &AssetSet,
    ) -> Result<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("program"),
            source: wgpu::ShaderSource::Wgsl(manifest.generated_wgsl.clone().into()),
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(EngineError::ShaderCompile {
                message: e.to_string(),
                source: manifest.generated_wgsl.clone(),
            });
        }

        let host_block = HostBlock::new(manifest);
        let host_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("host_block"),
            contents: host_block.as_bytes(),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        });

        let audio_staging_buffer = if manifest.sounds.is_empty() {
            None
        } else {
            Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("audio_staging"),
                size: 4 * manifest.sounds.len() as u64,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }))
        };

        let group0_layout = binding::group0_layout(device, manifest);
        let group1_layout = binding::group1_layout(device);
        let group2_layout = binding::group2_layout(device, manifest);

        let sampler = crate::assets::texture::create_shared_sampler(device);
        let mut group0_entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&sampler),
        }];
        let mut binding_index = 1u32;
        for texture in &assets.static_textures {
            group0_entries.push(wgpu::BindGroupEntry {
                binding: binding_index,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            binding_index += 1;
        }
        for video in &assets.videos {
            group0_entries.push(wgpu::BindGroupEntry {
                binding: binding_index,
                resource: wgpu::BindingResource::TextureView(&video.texture.view),
            });
            binding_index += 1;
        }
        for camera in &assets.cameras {
            group0_entries.push(wgpu::BindGroupEntry {
                binding: binding_index,
                resource: wgpu::BindingResource::TextureView(&camera.texture.view),
            });
            binding_index += 1;
        }
        let group0 = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("group0_textures"),
            layout: &group0_layout,
            entries: &group0_entries,
        });

        let group1 = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("group1_host_block"),
            layout: &group1_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: host_buffer.as_entire_binding(),
            }],
        });

        // Model buffers live only as long as the bind group that references them; once the bind
        // group is built we no longer need to hold onto them ourselves, wgpu keeps them alive.
        let mut model_buffers = Vec::with_capacity(2 * manifest.models.len());
        for model in &assets.models {
            let positions: Vec<PaddedVec3> = model
                .positions
                .iter()
                .map(|v| PaddedVec3 { xyz: v.to_array(), _pad: 0.0 })
                .collect();
            let normals: Vec<PaddedVec3> = model
                .normals
                .iter()
                .map(|v| PaddedVec3 { xyz: v.to_array(), _pad: 0.0 })
                .collect();
            let positions_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("model_positions"),
                contents: bytemuck::cast_slice(&positions),
                usage: wgpu::BufferUsages::STORAGE,
            });
            let normals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("model_normals"),
                contents: bytemuck::cast_slice(&normals),
                usage: wgpu::BufferUsages::STORAGE,
            });
            model_buffers.push(positions_buffer);
            model_buffers.push(normals_buffer);
        }
        let mut group2_entries = Vec::with_capacity(model_buffers.len());
        for (i, buffer) in model_buffers.iter().enumerate() {
            group2_entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: buffer.as_entire_binding(),
            });
        }
        let group2 = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("group2_models"),
            layout: &group2_layout,
            entries: &group2_entries,
        });

        // The compute pipeline only ever touches group 0 (textures) and group 1 (host block) —
        // group 2 (model buffers) is vertex/fragment-only (spec.md line 134) — so it gets its own,
        // narrower layout rather than sharing the render pipeline's three-group one.
        let compute_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compute_pipeline_layout"),
            bind_group_layouts: &[&group0_layout, &group1_layout],
            push_constant_ranges: &[],
        });
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("render_pipeline_layout"),
            bind_group_layouts: &[&group0_layout, &group1_layout, &group2_layout],
            push_constant_ranges: &[],
        });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("update"),
            layout: Some(&compute_pipeline_layout),
            module: &shader,
            entry_point: Some("update"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let (depth_texture, depth_view) = create_depth_texture(device, width, height);

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("render"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_render"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            host_buffer,
            audio_staging_buffer,
            group0,
            group1,
            group2,
            compute_pipeline,
            render_pipeline,
            depth_texture,
            depth_view,
        })
    }

    /// Recreates the depth texture to match a new surface size (spec.md §4.5's depth buffer must
    /// always match the color attachment it's paired with, or the render pass fails validation).
    pub fn resize_depth(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (texture, view) = create_depth_texture(device, width, height);
        self.depth_texture = texture;
        self.depth_view = view;
    }
}

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Per-frame keyboard/mouse input, captured by the runtime shell before `run_frame` is called
/// (spec.md §4.7 step 1).
#[derive(Debug, Clone)]
pub struct InputSnapshot {
    pub buttons: [i32; 12],
    pub keys: Vec<i32>,
    pub mouse: [f32; 4],
}

pub struct FrameScheduler {
    pub manifest: ProgramManifest,
    pub host_block: HostBlock,
    pub assets: AssetSet,
    pub audio: AudioOutput,
    pub osc: Option<OscListener>,
    osc_slot_by_name: HashMap<String, usize>,
    audio_map_ready: std::sync::Arc<std::sync::atomic::AtomicBool>,
    audio_map_pending: bool,
    time: f32,
}

impl FrameScheduler {
    pub fn new(manifest: ProgramManifest, assets: AssetSet, audio: AudioOutput, osc: Option<OscListener>) -> Self {
        let mut host_block = HostBlock::new(&manifest);
        host_block.set_screen_size(manifest.width as f32, manifest.height as f32);
        let osc_slot_by_name = manifest
            .osc_params
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let audio_map_ready = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        Self {
            manifest,
            host_block,
            assets,
            audio,
            osc,
            osc_slot_by_name,
            audio_map_ready,
            audio_map_pending: false,
            time: 0.0,
        }
    }

    /// Runs one full frame: input, OSC, dynamic textures, host block upload, compute dispatch,
    /// audio counter readback, render pass, submit, and (on the following frame) the async audio
    /// trigger/reset that step 9 starts.
    #[allow(clippy::too_many_arguments)]
    pub fn run_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_view: &wgpu::TextureView,
        program: &GpuProgram,
        input: InputSnapshot,
        delta_time: f32,
    ) {
        self.time += delta_time;

        // Step 1: input snapshot.
        self.host_block.set_buttons(input.buttons);
        self.host_block.set_keys(&input.keys);
        self.host_block.set_mouse(input.mouse[0], input.mouse[1], input.mouse[2], input.mouse[3]);
        self.host_block.set_time(self.time, delta_time);

        // Step 2: drain OSC. `/u/<name>` resolves against the parameter names the preprocessor
        // discovered; `/u/<n>` (already range-checked by the listener) writes the slot directly.
        if let Some(osc) = &self.osc {
            for msg in osc.drain() {
                match msg.target {
                    OscTarget::Name(name) => {
                        if let Some(&slot) = self.osc_slot_by_name.get(&name) {
                            self.host_block.set_osc(slot, msg.value);
                        }
                    }
                    OscTarget::Slot(slot) => self.host_block.set_osc(slot, msg.value),
                }
            }
        }

        // Step 3: dynamic texture upload (video/camera frames).
        for video in &mut self.assets.videos {
            video.poll(device, queue);
        }
        for camera in &mut self.assets.cameras {
            camera.poll(device, queue);
        }

        // Step 4: host block upload.
        queue.write_buffer(&program.host_buffer, 0, self.host_block.as_bytes());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame"),
        });

        // Step 5: compute dispatch (game-logic update entry point runs once per frame).
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("update"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&program.compute_pipeline);
            pass.set_bind_group(0, &program.group0, &[]);
            pass.set_bind_group(1, &program.group1, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }

        // Step 6: copy the audio trigger-counter region to a CPU-readable staging buffer, if the
        // program has any sounds at all.
        if let Some(staging) = &program.audio_staging_buffer {
            let offset = self.manifest.audio_offset() as u64;
            let size = 4 * self.manifest.sounds.len() as u64;
            encoder.copy_buffer_to_buffer(&program.host_buffer, offset, staging, 0, size);
        }

        // Step 7: render pass.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &program.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&program.render_pipeline);
            pass.set_bind_group(0, &program.group0, &[]);
            pass.set_bind_group(1, &program.group1, &[]);
            pass.set_bind_group(2, &program.group2, &[]);
            // A model-less program draws a fullscreen triangle; otherwise model 0 drives the
            // vertex count (spec.md line 150 — only the first model's geometry is ever drawn).
            let vertex_count = self
                .assets
                .models
                .first()
                .map(|m| m.positions.len() as u32)
                .unwrap_or(3);
            pass.draw(0..vertex_count, 0..1);
        }

        // Step 8: submit.
        queue.submit(std::iter::once(encoder.finish()));

        // Step 9: kick off the async audio readback for this frame's triggers. The mapping
        // callback runs once the device is polled; we pick up its result via
        // `poll_audio_triggers`, gated on `audio_map_ready` so a slow callback never causes
        // `get_mapped_range` to run on a buffer that isn't actually mapped yet. Only one mapping
        // may be in flight at a time (spec.md §5); if the previous frame's hasn't completed yet,
        // this frame's read-back is skipped entirely rather than double-mapping the buffer.
        if let Some(staging) = &program.audio_staging_buffer {
            if !self.audio_map_pending {
                self.audio_map_pending = true;
                self.audio_map_ready.store(false, std::sync::atomic::Ordering::Release);
                let ready = self.audio_map_ready.clone();
                let slice = staging.slice(..);
                slice.map_async(wgpu::MapMode::Read, move |result| {
                    if result.is_ok() {
                        ready.store(true, std::sync::atomic::Ordering::Release);
                    }
                });
            }
        }
    }

    /// Writes an OSC value directly by parameter name, for the `set OSC value by path` runtime
    /// control (spec.md §6.6). Returns `false` if no parameter with that name was discovered by
    /// the preprocessor.
    pub fn set_osc_by_name(&mut self, name: &str, value: f32) -> bool {
        match self.osc_slot_by_name.get(name) {
            Some(&slot) => {
                self.host_block.set_osc(slot, value);
                true
            }
            None => false,
        }
    }

    /// Resolves a video asset's manifest path to its index into `assets.videos`, for the runtime
    /// controls that address videos by path (spec.md §6.6).
    pub fn video_index_for_path(&self, path: &str) -> Option<usize> {
        self.manifest.videos.iter().position(|p| p == path)
    }

    pub fn video_mut(&mut self, index: usize) -> Option<&mut crate::assets::video::VideoSource> {
        self.assets.videos.get_mut(index)
    }

    /// Checks a previously-submitted audio staging buffer for trigger counters, plays any sound
    /// whose counter is nonzero, and resets the host block's counters so the next upload starts
    /// from zero (spec.md §4.7 step 9: the host always re-zeroes a counter before the shader can
    /// increment it again, so a bare `count > 0` check is sufficient — no baseline needs to be
    /// carried between frames).
    ///
    /// Does nothing if the mapping from the previous frame's `map_async` call hasn't completed
    /// yet — the caller is expected to `device.poll(..)` between `run_frame` and this call so the
    /// callback gets a chance to run; a skipped frame here just means the triggers fire a frame
    /// later than usual.
    pub fn poll_audio_triggers(&mut self, program: &GpuProgram) {
        let Some(staging) = &program.audio_staging_buffer else { return };
        if !self.audio_map_ready.swap(false, std::sync::atomic::Ordering::Acquire) {
            return;
        }
        let slice = staging.slice(..);
        let data = slice.get_mapped_range();
        let counts: &[u32] = bytemuck::cast_slice(&data);
        for (i, &count) in counts.iter().enumerate() {
            if count > 0 {
                if let Some(clip) = self.assets.sounds.get(i) {
                    if let Err(e) = self.audio.play(clip) {
                        log::warn!("failed to play sound {}: {e}", clip.path);
                    }
                }
            }
        }
        drop(data);
        staging.unmap();
        self.audio_map_pending = false;
        self.host_block.reset_audio_counters();
    }
}
