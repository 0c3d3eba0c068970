//! # Pipeline Module
//!
//! The retarget-and-export pipeline and the request boundary in front of it.
//!
//! A request flows through:
//! 1. [`RequestPlan::resolve`] - every field validated before any file exists
//! 2. [`MotionService::process`] - input staged, stem allocated, worker spawned
//! 3. [`ExportPipeline::run`] - load, fix coordinates, retarget, render, assemble
//!
//! Failures at any step leave no artifact with the request's stem behind.

pub mod retarget_loop;
pub mod runner;
pub mod service;

pub use retarget_loop::retarget_frames;
pub use runner::{ExportPipeline, PipelineJob};
pub use service::{MotionRequest, MotionService, RequestPlan, DEFAULT_INPUT_TYPE};
