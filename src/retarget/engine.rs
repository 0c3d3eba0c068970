use glam::DVec3;

use crate::error::BackendError;
use crate::motion::types::{MotionFrame, RobotPose};

/// Source skeleton the engines are built for. Frames always come from the
/// parametric SMPL-X body model, whatever file family carried them.
pub const SOURCE_SKELETON: &str = "smplx";

/// Everything needed to construct an engine for one request
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSpec {
    /// Estimated height of the performer in meters
    pub human_height: f64,

    /// Source skeleton identifier
    pub source: &'static str,

    /// Target robot identifier
    pub robot: String,
}

impl EngineSpec {
    pub fn new<S: Into<String>>(human_height: f64, robot: S) -> Self {
        Self {
            human_height,
            source: SOURCE_SKELETON,
            robot: robot.into(),
        }
    }
}

/// Simulated state of the robot, kept in sync with the retargeted pose
pub trait PhysicsState {
    /// Overwrite the generalized coordinates
    fn set_pose(&mut self, pose: &RobotPose) -> Result<(), BackendError>;

    /// Run forward kinematics so body world positions reflect the last pose
    fn forward(&mut self) -> Result<(), BackendError>;

    /// World position of a named body
    fn body_position(&self, body: &str) -> Result<DVec3, BackendError>;

    /// World positions of every body, in model order
    fn body_positions(&self) -> Vec<(String, DVec3)>;

    /// Largest offscreen image the model's rendering device supports, as
    /// (width, height). A zero dimension means the model sets no limit.
    fn max_offscreen_size(&self) -> (u32, u32);
}

/// Maps human frames onto one robot
pub trait RetargetEngine: Send {
    /// Retarget a single frame
    ///
    /// The returned pose may live in a buffer the engine reuses on the next
    /// call; callers copy it if they keep it.
    fn retarget(&mut self, frame: &MotionFrame) -> Result<&RobotPose, BackendError>;

    /// Physics state bound to the engine's robot model
    fn physics(&mut self) -> &mut dyn PhysicsState;
}

/// Builds a fresh engine per request
pub trait EngineFactory: Send + Sync {
    fn build(&self, spec: &EngineSpec) -> Result<Box<dyn RetargetEngine>, BackendError>;
}
