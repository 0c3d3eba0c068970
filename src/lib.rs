//! # Retarget-Render
//!
//! Retarget human motion capture onto humanoid robots and export the result as
//! a tracked-camera video, a trajectory pickle, a CSV table, or a zip of these.
//!
//! The retargeting solver and the body-model loader live outside this crate and
//! plug in through the [`FrameSource`](motion::FrameSource) and
//! [`EngineFactory`](retarget::EngineFactory) traits. Video rendering ships
//! with a software skeleton renderer and an ffmpeg-backed encoder.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use retarget_render::{
//!     config::Config,
//!     motion::FrameSource,
//!     pipeline::{MotionRequest, MotionService},
//!     render::SoftwareRenderBackend,
//!     retarget::EngineFactory,
//! };
//!
//! # async fn run(frames: Arc<dyn FrameSource>, engines: Arc<dyn EngineFactory>) -> anyhow::Result<()> {
//! let config = Config::default();
//! let backend = Arc::new(SoftwareRenderBackend::new(&config.render));
//! let service = MotionService::new(config, frames, engines, backend)?;
//!
//! let bytes = std::fs::read("walk.pt")?;
//! let request = MotionRequest::new("walk.pt", bytes)
//!     .with_robot("unitree_g1")
//!     .with_output_formats("mp4,csv");
//!
//! let artifact = service.process(request).await?;
//! println!("{} ({})", artifact.path.display(), artifact.media_type);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`motion`] - frames, poses, input families and coordinate fixes
//! - [`retarget`] - retargeting engine and physics state interfaces
//! - [`render`] - tracking camera, renderer, video encoder and render session
//! - [`export`] - output negotiation, trajectory/CSV writers and bundling
//! - [`pipeline`] - the frame loop, the export pipeline and the request service
//! - [`config`] - configuration management

pub mod config;
pub mod error;
pub mod export;
pub mod motion;
pub mod pipeline;
pub mod render;
pub mod retarget;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{ExportError, Result},
    export::{DeliveredArtifact, OutputFormat, OutputRequest},
    pipeline::{MotionRequest, MotionService},
};
