//! # Motion Module
//!
//! Human motion data as the pipeline sees it: frames of joint poses, robot
//! poses produced from them, input families and coordinate fixes.

pub mod coords;
pub mod source;
pub mod types;

pub use coords::{correct_frames, CoordFix};
pub use source::{FrameSource, InputFamily, LoadedMotion};
pub use types::{wxyz_to_xyzw, xyzw_to_wxyz, FrameSequence, JointPose, MotionFrame, RobotPose};
