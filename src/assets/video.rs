//! Video and camera frame sources (spec.md §4.4, §6.1): both bind into group 0 as ordinary
//! `texture_2d<f32>`s, updated once per frame from a `gstreamer` appsink pulling RGBA buffers.
//! Gated behind the `media` feature, same as the teacher's optional media pipeline.

use crate::error::{EngineError, Result};
use crate::resolver::FileResolver;
use crate::assets::texture::GpuTexture;
use std::path::PathBuf;

#[cfg(feature = "media")]
mod gst_backend {
    use super::*;
    use gstreamer as gst;
    use gstreamer::prelude::*;
    use gstreamer_app as gst_app;

    pub struct Backend {
        pipeline: gst::Pipeline,
        appsink: gst_app::AppSink,
        looping: bool,
        _temp_file: Option<tempfile::NamedTempFile>,
    }

    impl Backend {
        fn from_description(description: &str, looping: bool, temp_file: Option<tempfile::NamedTempFile>) -> Result<Self> {
            gst::init().map_err(|e| EngineError::AssetNotFound(PathBuf::from(format!("gstreamer init failed: {e}"))))?;
            let pipeline = gst::parse::launch(description)
                .map_err(|e| EngineError::AssetNotFound(PathBuf::from(format!("pipeline `{description}`: {e}"))))?
                .downcast::<gst::Pipeline>()
                .map_err(|_| EngineError::AssetNotFound(PathBuf::from("pipeline is not a gst::Pipeline")))?;
            let sink = pipeline
                .by_name("sink")
                .ok_or_else(|| EngineError::AssetNotFound(PathBuf::from("appsink `sink` not found")))?;
            let appsink = sink
                .downcast::<gst_app::AppSink>()
                .map_err(|_| EngineError::AssetNotFound(PathBuf::from("`sink` element is not an appsink")))?;
            appsink.set_property("sync", false);
            appsink.set_property("max-buffers", 1u32);
            appsink.set_property("drop", true);

            pipeline
                .set_state(gst::State::Playing)
                .map_err(|e| EngineError::AssetNotFound(PathBuf::from(format!("pipeline failed to start: {e}"))))?;

            Ok(Self { pipeline, appsink, looping, _temp_file: temp_file })
        }

        pub fn new_file(path: &std::path::Path, looping: bool, temp_file: Option<tempfile::NamedTempFile>) -> Result<Self> {
            let uri = format!("file://{}", path.display());
            let description = format!(
                "uridecodebin uri=\"{uri}\" ! videoconvert ! video/x-raw,format=RGBA ! appsink name=sink"
            );
            Self::from_description(&description, looping, temp_file)
        }

        pub fn new_camera(device_index: i64) -> Result<Self> {
            let description = camera_pipeline(device_index);
            Self::from_description(&description, false, None)
        }

        /// Pulls the most recent available frame, if any, without blocking.
        pub fn pull_frame(&mut self) -> Option<image::RgbaImage> {
            let sample = match self.appsink.try_pull_sample(gst::ClockTime::ZERO) {
                Some(s) => s,
                None => {
                    if self.looping && self.pipeline.bus().map(|b| b.have_pending()).unwrap_or(false) {
                        self.handle_eos();
                    }
                    return None;
                }
            };
            let caps = sample.caps()?;
            let s = caps.structure(0)?;
            let width: i32 = s.get("width").ok()?;
            let height: i32 = s.get("height").ok()?;
            let buffer = sample.buffer()?;
            let map = buffer.map_readable().ok()?;
            image::RgbaImage::from_raw(width as u32, height as u32, map.as_slice().to_vec())
        }

        fn handle_eos(&mut self) {
            if let Some(bus) = self.pipeline.bus() {
                while let Some(msg) = bus.pop() {
                    if let gst::MessageView::Eos(_) = msg.view() {
                        let _ = self.pipeline.seek_simple(
                            gst::SeekFlags::FLUSH,
                            gst::ClockTime::ZERO,
                        );
                    }
                }
            }
        }

        pub fn play(&mut self) {
            let _ = self.pipeline.set_state(gst::State::Playing);
        }

        pub fn pause(&mut self) {
            let _ = self.pipeline.set_state(gst::State::Paused);
        }

        pub fn stop(&mut self) {
            let _ = self.pipeline.set_state(gst::State::Paused);
            let _ = self.pipeline.seek_simple(gst::SeekFlags::FLUSH, gst::ClockTime::ZERO);
        }

        pub fn seek(&mut self, seconds: f32) {
            let position = gst::ClockTime::from_nseconds((seconds.max(0.0) as f64 * 1_000_000_000.0) as u64);
            let _ = self.pipeline.seek_simple(gst::SeekFlags::FLUSH, position);
        }

        pub fn current_time(&self) -> f32 {
            self.pipeline
                .query_position::<gst::ClockTime>()
                .map(|t| t.nseconds() as f32 / 1_000_000_000.0)
                .unwrap_or(0.0)
        }

        pub fn duration(&self) -> f32 {
            self.pipeline
                .query_duration::<gst::ClockTime>()
                .map(|t| t.nseconds() as f32 / 1_000_000_000.0)
                .unwrap_or(0.0)
        }

        pub fn paused(&self) -> bool {
            self.pipeline.current_state() == gst::State::Paused
        }
    }

    impl Drop for Backend {
        fn drop(&mut self) {
            let _ = self.pipeline.set_state(gst::State::Null);
        }
    }

    /// Builds a platform-appropriate capture pipeline for `device_index`, following the same
    /// per-OS branching the teacher's `build.rs` already applies to locate GStreamer itself.
    fn camera_pipeline(device_index: i64) -> String {
        let source = if cfg!(target_os = "linux") {
            format!("v4l2src device=/dev/video{device_index}")
        } else if cfg!(target_os = "windows") {
            format!("ksvideosrc device-index={device_index}")
        } else if cfg!(target_os = "macos") {
            format!("avfvideosrc device-index={device_index}")
        } else {
            "videotestsrc".to_string()
        };
        format!("{source} ! videoconvert ! video/x-raw,format=RGBA ! appsink name=sink")
    }
}

/// A moving image source (decoded video file or live camera) bound as a regular texture.
/// `backend` is `None` for a [`placeholder`](Self::placeholder) or when the `media` feature is
/// disabled — `poll` is then simply a no-op and the texture stays a static 1x1 black frame.
pub struct VideoSource {
    pub texture: GpuTexture,
    #[cfg(feature = "media")]
    backend: Option<gst_backend::Backend>,
}

impl VideoSource {
    pub fn from_file(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        resolver: &dyn FileResolver,
        path: &str,
    ) -> Result<Self> {
        #[cfg(feature = "media")]
        {
            let bytes = resolver.read_bytes(path)?;
            let mut temp = tempfile::NamedTempFile::new()?;
            std::io::Write::write_all(&mut temp, &bytes)?;
            let mut backend = gst_backend::Backend::new_file(temp.path(), true, Some(temp))?;
            let first = wait_for_first_frame(&mut backend)?;
            let texture = GpuTexture::from_rgba(device, queue, &first, Some(path));
            Ok(Self { texture, backend: Some(backend) })
        }
        #[cfg(not(feature = "media"))]
        {
            let _ = (device, queue, resolver, path);
            Err(media_disabled_error(path))
        }
    }

    pub fn from_camera(device: &wgpu::Device, queue: &wgpu::Queue, device_index: i64) -> Result<Self> {
        #[cfg(feature = "media")]
        {
            let mut backend = gst_backend::Backend::new_camera(device_index)?;
            let first = wait_for_first_frame(&mut backend)?;
            let texture = GpuTexture::from_rgba(device, queue, &first, Some(&format!("camera{device_index}")));
            Ok(Self { texture, backend: Some(backend) })
        }
        #[cfg(not(feature = "media"))]
        {
            let _ = (device, queue, device_index);
            Err(media_disabled_error(&format!("camera {device_index}")))
        }
    }

    /// A static 1x1 black texture, used when a video or camera source fails to open (spec.md §7:
    /// these are optional assets, so a failure degrades rather than aborting program load).
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let image = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        let texture = GpuTexture::from_rgba(device, queue, &image, Some("placeholder"));
        #[cfg(feature = "media")]
        {
            Self { texture, backend: None }
        }
        #[cfg(not(feature = "media"))]
        {
            Self { texture }
        }
    }

    /// Polls for a newer frame and uploads it if one arrived (spec.md §4.7 step 3: dynamic
    /// textures upload once per frame, before the host block).
    pub fn poll(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        #[cfg(feature = "media")]
        if let Some(backend) = &mut self.backend {
            if let Some(frame) = backend.pull_frame() {
                self.texture.update(device, queue, &frame);
            }
        }
        #[cfg(not(feature = "media"))]
        {
            let _ = (device, queue);
        }
    }

    /// Runtime controls (spec.md §6.6): no-ops for a placeholder or when `media` is disabled.
    pub fn play(&mut self) {
        #[cfg(feature = "media")]
        if let Some(b) = &mut self.backend {
            b.play();
        }
    }

    pub fn pause(&mut self) {
        #[cfg(feature = "media")]
        if let Some(b) = &mut self.backend {
            b.pause();
        }
    }

    pub fn stop(&mut self) {
        #[cfg(feature = "media")]
        if let Some(b) = &mut self.backend {
            b.stop();
        }
    }

    pub fn seek(&mut self, seconds: f32) {
        #[cfg(feature = "media")]
        if let Some(b) = &mut self.backend {
            b.seek(seconds);
        }
    }

    pub fn current_time(&self) -> f32 {
        #[cfg(feature = "media")]
        if let Some(b) = &self.backend {
            return b.current_time();
        }
        0.0
    }

    pub fn duration(&self) -> f32 {
        #[cfg(feature = "media")]
        if let Some(b) = &self.backend {
            return b.duration();
        }
        0.0
    }

    pub fn paused(&self) -> bool {
        #[cfg(feature = "media")]
        if let Some(b) = &self.backend {
            return b.paused();
        }
        false
    }
}

#[cfg(feature = "media")]
fn wait_for_first_frame(backend: &mut gst_backend::Backend) -> Result<image::RgbaImage> {
    for _ in 0..200 {
        if let Some(frame) = backend.pull_frame() {
            return Ok(frame);
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    Err(EngineError::AssetNotFound(PathBuf::from("video/camera produced no frame within 2s")))
}

#[cfg(not(feature = "media"))]
fn media_disabled_error(what: &str) -> EngineError {
    EngineError::AssetNotFound(PathBuf::from(format!("media support disabled at build time: {what}")))
}
