use std::collections::HashMap;

use glam::{DQuat, DVec3};

use crate::error::{BackendError, ExportError, Result};

/// World pose of one human joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub position: DVec3,
    pub orientation: DQuat,
}

impl JointPose {
    pub fn new(position: DVec3, orientation: DQuat) -> Self {
        Self { position, orientation }
    }

    /// Build from a position and a scalar-first (w, x, y, z) quaternion
    pub fn from_wxyz(position: [f64; 3], orientation: [f64; 4]) -> Self {
        let [w, x, y, z] = orientation;
        Self {
            position: DVec3::from_array(position),
            orientation: DQuat::from_xyzw(x, y, z, w),
        }
    }

    /// Orientation as a scalar-first (w, x, y, z) array
    pub fn orientation_wxyz(&self) -> [f64; 4] {
        let q = self.orientation;
        [q.w, q.x, q.y, q.z]
    }
}

/// One sample of a human motion: every tracked joint's world pose
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionFrame {
    joints: HashMap<String, JointPose>,
}

impl MotionFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a joint
    pub fn insert<S: Into<String>>(&mut self, name: S, pose: JointPose) {
        self.joints.insert(name.into(), pose);
    }

    pub fn get(&self, name: &str) -> Option<&JointPose> {
        self.joints.get(name)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JointPose)> {
        self.joints.iter()
    }

    /// Build a new frame by transforming every joint pose
    pub fn map_poses<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&JointPose) -> JointPose,
    {
        Self {
            joints: self.joints.iter().map(|(name, pose)| (name.clone(), f(pose))).collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, JointPose)> for MotionFrame {
    fn from_iter<I: IntoIterator<Item = (S, JointPose)>>(iter: I) -> Self {
        Self {
            joints: iter.into_iter().map(|(name, pose)| (name.into(), pose)).collect(),
        }
    }
}

/// Time-ordered motion frames sampled at a fixed rate
///
/// The frame order is the motion's time axis; nothing in the crate reorders it.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    frames: Vec<MotionFrame>,
    fps: u32,
}

impl FrameSequence {
    pub fn new(frames: Vec<MotionFrame>, fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(ExportError::invalid_configuration("frame rate must be positive"));
        }
        Ok(Self { frames, fps })
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frames(&self) -> &[MotionFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MotionFrame> {
        self.frames.iter()
    }

    /// Apply `f` to every frame in order, keeping the frame rate
    pub fn map_frames<F>(&self, f: F) -> Self
    where
        F: FnMut(&MotionFrame) -> MotionFrame,
    {
        Self {
            frames: self.frames.iter().map(f).collect(),
            fps: self.fps,
        }
    }
}

/// Number of leading values holding the floating base: position then quaternion
pub const ROOT_WIDTH: usize = 7;

/// Generalized coordinates of the robot for one frame
///
/// Layout: root position (3), root orientation w-x-y-z (4), joint positions (N).
#[derive(Debug, Clone, PartialEq)]
pub struct RobotPose {
    values: Vec<f64>,
}

impl RobotPose {
    pub fn new(values: Vec<f64>) -> std::result::Result<Self, BackendError> {
        if values.len() < ROOT_WIDTH {
            return Err(BackendError::new(format!(
                "robot pose needs at least {} values, got {}",
                ROOT_WIDTH,
                values.len()
            )));
        }
        Ok(Self { values })
    }

    pub fn from_parts(root_position: [f64; 3], root_orientation_wxyz: [f64; 4], joints: &[f64]) -> Self {
        let mut values = Vec::with_capacity(ROOT_WIDTH + joints.len());
        values.extend_from_slice(&root_position);
        values.extend_from_slice(&root_orientation_wxyz);
        values.extend_from_slice(joints);
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn root_position(&self) -> [f64; 3] {
        [self.values[0], self.values[1], self.values[2]]
    }

    pub fn root_orientation_wxyz(&self) -> [f64; 4] {
        [self.values[3], self.values[4], self.values[5], self.values[6]]
    }

    pub fn root_orientation_xyzw(&self) -> [f64; 4] {
        wxyz_to_xyzw(self.root_orientation_wxyz())
    }

    pub fn joint_positions(&self) -> &[f64] {
        &self.values[ROOT_WIDTH..]
    }

    /// Number of actuated joints (N)
    pub fn dof(&self) -> usize {
        self.values.len() - ROOT_WIDTH
    }
}

/// Reorder a scalar-first quaternion to scalar-last. Pure permutation.
pub fn wxyz_to_xyzw(q: [f64; 4]) -> [f64; 4] {
    [q[1], q[2], q[3], q[0]]
}

/// Reorder a scalar-last quaternion to scalar-first. Inverse of [`wxyz_to_xyzw`].
pub fn xyzw_to_wxyz(q: [f64; 4]) -> [f64; 4] {
    [q[3], q[0], q[1], q[2]]
}
