//! Coordinate convention fixes applied to frames before retargeting.

use std::fmt;
use std::str::FromStr;

use glam::{DMat3, DQuat, DVec3};
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::motion::source::InputFamily;
use crate::motion::types::{FrameSequence, JointPose};

/// Basis change requested for an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordFix {
    #[default]
    None,
    /// Y-up input rotated into the Z-up world: X stays, Y becomes -Z, Z becomes Y
    YupToZup,
}

impl CoordFix {
    pub fn token(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::YupToZup => "yup_to_zup",
        }
    }

    /// Check the fix is meaningful for the input family
    pub fn validate_for(&self, family: InputFamily) -> Result<()> {
        if *self != Self::None && family.is_native_zup() {
            return Err(ExportError::invalid_configuration(
                "coord_fix is only supported for smplx_npz input",
            ));
        }
        Ok(())
    }
}

impl FromStr for CoordFix {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "yup_to_zup" => Ok(Self::YupToZup),
            _ => Err(ExportError::invalid_configuration(
                "coord_fix must be one of: none, yup_to_zup",
            )),
        }
    }
}

impl fmt::Display for CoordFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Rotation matrix of the y-up to z-up fix. Same basis change the GVHMR
/// loader applies internally, so both input families agree.
pub fn yup_to_zup_matrix() -> DMat3 {
    // columns: images of X, Y, Z
    DMat3::from_cols(DVec3::X, DVec3::Z, DVec3::NEG_Y)
}

/// Apply `fix` to every joint of every frame
///
/// Positions are rotated by the basis matrix and the same rotation is
/// pre-multiplied onto each orientation (a world-frame rotation). The frame
/// order and rate are preserved.
pub fn correct_frames(sequence: FrameSequence, fix: CoordFix) -> FrameSequence {
    match fix {
        CoordFix::None => sequence,
        CoordFix::YupToZup => {
            let matrix = yup_to_zup_matrix();
            let rotation = DQuat::from_mat3(&matrix);

            debug!("Applying {} to {} frames", fix, sequence.len());

            sequence.map_frames(|frame| {
                frame.map_poses(|pose| JointPose {
                    position: matrix * pose.position,
                    orientation: rotation * pose.orientation,
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::types::MotionFrame;

    fn sequence_with(pose: JointPose) -> FrameSequence {
        let frame: MotionFrame = [("pelvis", pose)].into_iter().collect();
        FrameSequence::new(vec![frame.clone(), frame], 30).unwrap()
    }

    #[test]
    fn test_none_is_identity() {
        let seq = sequence_with(JointPose::from_wxyz([0.1, 0.2, 0.3], [1.0, 0.0, 0.0, 0.0]));
        let corrected = correct_frames(seq.clone(), CoordFix::None);
        assert_eq!(corrected, seq);
    }

    #[test]
    fn test_positions_follow_basis_change() {
        let seq = sequence_with(JointPose::from_wxyz([1.0, 2.0, 3.0], [1.0, 0.0, 0.0, 0.0]));
        let corrected = correct_frames(seq, CoordFix::YupToZup);

        assert_eq!(corrected.len(), 2);
        assert_eq!(corrected.fps(), 30);
        let pelvis = corrected.frames()[0].get("pelvis").unwrap();
        assert_eq!(pelvis.position, DVec3::new(1.0, -3.0, 2.0));
    }

    #[test]
    fn test_orientation_is_premultiplied() {
        let yaw = DQuat::from_rotation_z(0.4);
        let seq = sequence_with(JointPose::new(DVec3::ZERO, yaw));
        let corrected = correct_frames(seq, CoordFix::YupToZup);
        let q = corrected.frames()[1].get("pelvis").unwrap().orientation;

        let expected = DQuat::from_rotation_x(std::f64::consts::FRAC_PI_2) * yaw;
        assert!(q.dot(expected).abs() > 1.0 - 1e-12);
        assert_ne!(q, yaw);

        // the rotated orientation maps local axes exactly like the matrix does
        let local = DVec3::new(0.3, -0.7, 0.2);
        let via_quat = q * local;
        let via_matrix = yup_to_zup_matrix() * (yaw * local);
        assert!(via_quat.abs_diff_eq(via_matrix, 1e-12));
    }

    #[test]
    fn test_identity_orientation_becomes_the_fix_rotation() {
        let seq = sequence_with(JointPose::from_wxyz([0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]));
        let corrected = correct_frames(seq, CoordFix::YupToZup);
        let [w, x, y, z] = corrected.frames()[0].get("pelvis").unwrap().orientation_wxyz();

        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert!((w.abs() - half).abs() < 1e-12);
        assert!((x.abs() - half).abs() < 1e-12);
        assert!(y.abs() < 1e-12 && z.abs() < 1e-12);
    }

    #[test]
    fn test_fix_rejected_for_native_zup_family() {
        let err = CoordFix::YupToZup.validate_for(InputFamily::Gvhmr).unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfiguration { .. }));

        assert!(CoordFix::None.validate_for(InputFamily::Gvhmr).is_ok());
        assert!(CoordFix::YupToZup.validate_for(InputFamily::SmplxNpz).is_ok());
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!("none".parse::<CoordFix>().unwrap(), CoordFix::None);
        assert_eq!("YUP_TO_ZUP".parse::<CoordFix>().unwrap(), CoordFix::YupToZup);
        assert!("zup_to_yup".parse::<CoordFix>().is_err());
    }
}
