//! # Render Module
//!
//! Tracked-camera video output: the per-request render configuration, the
//! renderer and video sink interfaces, a built-in software backend, and the
//! session that owns both handles for one run.

pub mod backend;
pub mod encoder;
pub mod renderer;
pub mod session;
pub mod types;

pub use backend::{RenderBackend, SoftwareRenderBackend};
pub use encoder::{FfmpegSettings, FfmpegVideoSink, VideoSink};
pub use renderer::{FrameRenderer, SkeletonRenderer, SkeletonStyle};
pub use session::RenderSession;
pub use types::{Frame, Projection, RenderConfig, TrackingCamera};
