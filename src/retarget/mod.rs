//! # Retargeting Interfaces
//!
//! The retargeting solver lives outside this crate. These traits describe
//! what the export pipeline needs from it: a per-frame solve and access to
//! the physics state that video rendering reads from.

pub mod engine;

pub use engine::{EngineFactory, EngineSpec, PhysicsState, RetargetEngine, SOURCE_SKELETON};
