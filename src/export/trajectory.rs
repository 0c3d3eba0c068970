use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::motion::types::RobotPose;

/// Retargeted motion split into root and joint channels
///
/// Serialized as a pickled dict with keys `fps`, `root_pos`, `root_rot`
/// (x-y-z-w), `dof_pos`, and the reserved `local_body_pos` and
/// `link_body_list`, both always `None`. Channels unpickle as nested Python
/// lists, not numpy arrays; consumers that slice by column call
/// `np.asarray` on them first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub fps: u32,
    pub root_pos: Vec<[f64; 3]>,
    pub root_rot: Vec<[f64; 4]>,
    pub dof_pos: Vec<Vec<f64>>,
    pub local_body_pos: Option<Vec<f64>>,
    pub link_body_list: Option<Vec<String>>,
}

impl TrajectoryRecord {
    /// Split accumulated poses. Every pose must have the same joint count.
    pub fn from_poses(poses: &[RobotPose], fps: u32) -> Result<Self> {
        if let Some(first) = poses.first() {
            let dof = first.dof();
            if let Some((frame, pose)) = poses.iter().enumerate().find(|(_, p)| p.dof() != dof) {
                return Err(ExportError::RetargetFailure {
                    frame,
                    reason: format!("pose has {} joints, earlier frames had {}", pose.dof(), dof),
                });
            }
        }

        Ok(Self {
            fps,
            root_pos: poses.iter().map(RobotPose::root_position).collect(),
            root_rot: poses.iter().map(RobotPose::root_orientation_xyzw).collect(),
            dof_pos: poses.iter().map(|p| p.joint_positions().to_vec()).collect(),
            local_body_pos: None,
            link_body_list: None,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.root_pos.len()
    }

    /// Joint count per frame; `None` for an empty record
    pub fn dof(&self) -> Option<usize> {
        self.dof_pos.first().map(Vec::len)
    }

    /// Write the record as a Python pickle
    pub fn write_pickle(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_pickle::to_writer(&mut writer, self, serde_pickle::SerOptions::new())?;
        writer.flush()?;
        debug!("Wrote {} trajectory frames to {:?}", self.frame_count(), path);
        Ok(())
    }

    pub fn read_pickle(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_pickle::from_reader(file, serde_pickle::DeOptions::new())?)
    }
}
