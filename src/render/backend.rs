use std::path::Path;

use crate::config::RenderSettings;
use crate::error::BackendError;
use crate::render::encoder::{FfmpegSettings, FfmpegVideoSink, VideoSink};
use crate::render::renderer::{FrameRenderer, SkeletonRenderer, SkeletonStyle};

/// Factory for the per-request render resources
///
/// A backend is chosen once at startup and handed to the service; each run
/// opens its own renderer and sink from it.
pub trait RenderBackend: Send + Sync {
    fn open_renderer(&self, width: u32, height: u32) -> Result<Box<dyn FrameRenderer>, BackendError>;

    fn open_sink(
        &self,
        path: &Path,
        fps: u32,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn VideoSink>, BackendError>;
}

/// Built-in backend: [`SkeletonRenderer`] frames encoded by ffmpeg
#[derive(Debug, Clone)]
pub struct SoftwareRenderBackend {
    ffmpeg: FfmpegSettings,
    style: SkeletonStyle,
}

impl SoftwareRenderBackend {
    pub fn new(settings: &RenderSettings) -> Self {
        Self {
            ffmpeg: FfmpegSettings::from(settings),
            style: SkeletonStyle::default(),
        }
    }

    pub fn with_style(mut self, style: SkeletonStyle) -> Self {
        self.style = style;
        self
    }

    /// Whether the encoder binary can be launched
    pub fn encoder_available(&self) -> bool {
        self.ffmpeg.is_available()
    }
}

impl RenderBackend for SoftwareRenderBackend {
    fn open_renderer(&self, width: u32, height: u32) -> Result<Box<dyn FrameRenderer>, BackendError> {
        Ok(Box::new(SkeletonRenderer::new(width, height, self.style.clone())?))
    }

    fn open_sink(
        &self,
        path: &Path,
        fps: u32,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn VideoSink>, BackendError> {
        Ok(Box::new(FfmpegVideoSink::open(&self.ffmpeg, path, fps, width, height)?))
    }
}
