use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, info, warn};

use crate::config::RenderSettings;
use crate::error::BackendError;
use crate::render::types::Frame;

/// Ordered, single-stream sink for rendered frames
pub trait VideoSink: Send {
    /// Append the next frame. Frames must arrive in playback order.
    fn append(&mut self, frame: &Frame) -> Result<(), BackendError>;

    /// Finalize the file. Called exactly once by the owning session.
    fn close(&mut self) -> Result<(), BackendError>;
}

/// How the ffmpeg encoder is invoked
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegSettings {
    pub binary: String,
    pub codec: String,
    pub quality: u8,
}

impl From<&RenderSettings> for FfmpegSettings {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            binary: settings.ffmpeg_binary.clone(),
            codec: settings.codec.clone(),
            quality: settings.quality,
        }
    }
}

impl FfmpegSettings {
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn crf(&self) -> u8 {
        (51 - ((self.quality as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }
}

/// Streams raw RGB frames into an `ffmpeg` child process
///
/// The child reads `rgb24` frames from stdin at a fixed rate and writes the
/// mp4 when stdin closes.
pub struct FfmpegVideoSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    path: PathBuf,
    width: u32,
    height: u32,
    frames_written: usize,
}

impl FfmpegVideoSink {
    pub fn open(
        settings: &FfmpegSettings,
        path: &Path,
        fps: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, BackendError> {
        let size = format!("{}x{}", width, height);
        let rate = fps.to_string();
        let crf = settings.crf().to_string();

        let mut cmd = Command::new(&settings.binary);
        cmd.args([
            "-loglevel", "error",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "-s", size.as_str(),
            "-r", rate.as_str(),
            "-i", "-",
            "-c:v", settings.codec.as_str(),
            "-pix_fmt", "yuv420p",
            "-crf", crf.as_str(),
        ]);

        // yuv420p needs even dimensions: odd sizes gain one padding row or
        // column, so the mp4 is up to 1px larger than the frames
        if width % 2 == 1 || height % 2 == 1 {
            cmd.args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"]);
        }

        cmd.arg("-y")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("Spawning encoder: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            BackendError::new(format!("failed to spawn {}: {}", settings.binary, e))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| BackendError::new("encoder stdin unavailable"))?;

        Ok(Self {
            child: Some(child),
            stdin: Some(stdin),
            path: path.to_path_buf(),
            width,
            height,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }
}

impl VideoSink for FfmpegVideoSink {
    fn append(&mut self, frame: &Frame) -> Result<(), BackendError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(BackendError::new(format!(
                "frame is {}x{} but the stream is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| BackendError::new("video stream already closed"))?;
        stdin.write_all(frame.as_rgb_bytes())?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        // closing stdin signals end of stream
        drop(self.stdin.take());

        let Some(child) = self.child.take() else {
            return Ok(());
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::new(format!("ffmpeg failed: {}", stderr.trim())));
        }

        info!("Encoded {} frames to {:?}", self.frames_written, self.path);
        Ok(())
    }
}

impl Drop for FfmpegVideoSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            // an already exited child is fine here, wait() reaps it either way
            let _ = child.kill();
            if let Err(e) = child.wait() {
                warn!("Failed to stop encoder process for {:?}: {}", self.path, e);
            }
        }
    }
}
