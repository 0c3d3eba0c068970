use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ExportError, Result};
use crate::render::backend::RenderBackend;
use crate::render::encoder::VideoSink;
use crate::render::renderer::FrameRenderer;
use crate::render::types::RenderConfig;
use crate::retarget::PhysicsState;

/// Renderer and video sink owned by one pipeline run
///
/// Both handles are released exactly once: by [`finish`](Self::finish) on
/// success, by [`abort`](Self::abort) on failure, or by `Drop` if neither ran.
/// Errors raised while *releasing* after a failure are logged and never
/// replace the failure being reported.
pub struct RenderSession {
    renderer: Option<Box<dyn FrameRenderer>>,
    sink: Option<Box<dyn VideoSink>>,
    view: RenderConfig,
    frames_written: usize,
}

impl RenderSession {
    /// Acquire the sink and renderer for `view`, which must already be clamped
    pub fn open(backend: &dyn RenderBackend, view: RenderConfig, path: &Path, fps: u32) -> Result<Self> {
        let sink = backend
            .open_sink(path, fps, view.width, view.height)
            .map_err(|e| ExportError::render_failure(format!("failed to open video writer: {}", e)))?;

        // from here on `session` owns the sink, so an early return still releases it
        let mut session = Self {
            renderer: None,
            sink: Some(sink),
            view,
            frames_written: 0,
        };

        let renderer = backend
            .open_renderer(session.view.width, session.view.height)
            .map_err(|e| ExportError::render_failure(format!("failed to create renderer: {}", e)))?;
        session.renderer = Some(renderer);

        debug!("Render session open: {}x{} -> {:?}", session.view.width, session.view.height, path);
        Ok(session)
    }

    pub fn view(&self) -> &RenderConfig {
        &self.view
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Render the current physics state with the camera locked on the base
    /// link, and append the image to the video stream
    pub fn render_frame(&mut self, index: usize, state: &dyn PhysicsState) -> Result<()> {
        let lookat = state.body_position(&self.view.base_link).map_err(|e| {
            ExportError::render_failure(format!("frame {}: base link '{}': {}", index, self.view.base_link, e))
        })?;
        let camera = self.view.camera(lookat);

        let (Some(renderer), Some(sink)) = (self.renderer.as_mut(), self.sink.as_mut()) else {
            return Err(ExportError::render_failure("render session already released"));
        };

        let frame = renderer
            .render(state, &camera)
            .map_err(|e| ExportError::render_failure(format!("frame {}: {}", index, e)))?;

        sink.append(&frame)
            .map_err(|e| ExportError::render_failure(format!("frame {}: failed to encode: {}", index, e)))?;

        self.frames_written += 1;
        Ok(())
    }

    /// Release everything after a successful loop. A renderer close error is
    /// only logged; failing to finalize the video is an error because the file
    /// would be unusable.
    pub fn finish(mut self) -> Result<usize> {
        self.release_renderer();

        if let Some(mut sink) = self.sink.take() {
            sink.close()
                .map_err(|e| ExportError::render_failure(format!("failed to finalize video: {}", e)))?;
        }

        Ok(self.frames_written)
    }

    /// Release everything after a failure, logging release errors
    pub fn abort(mut self) {
        self.release_quietly();
    }

    fn release_renderer(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            if let Err(e) = renderer.close() {
                warn!("Renderer close failed (ignored): {}", e);
            }
        }
    }

    fn release_quietly(&mut self) {
        self.release_renderer();
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close() {
                warn!("Video writer close failed (ignored): {}", e);
            }
        }
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.release_quietly();
    }
}
