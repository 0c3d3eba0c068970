use tracing::debug;

use crate::error::{ExportError, Result};
use crate::motion::types::{FrameSequence, RobotPose};
use crate::render::session::RenderSession;
use crate::retarget::RetargetEngine;

/// Drive the engine over every frame, strictly in order
///
/// Per frame: retarget, copy the pose out of the engine, write it into the
/// physics state and run forward kinematics, then (with a session) render the
/// tracked view and append it to the video. Poses are only kept when
/// `accumulate` is set. The first error stops the loop; the caller owns
/// releasing the session.
pub fn retarget_frames(
    engine: &mut dyn RetargetEngine,
    frames: &FrameSequence,
    accumulate: bool,
    mut video: Option<&mut RenderSession>,
) -> Result<Vec<RobotPose>> {
    let mut poses = Vec::with_capacity(if accumulate { frames.len() } else { 0 });

    for (index, frame) in frames.iter().enumerate() {
        let pose = engine
            .retarget(frame)
            .map_err(|e| ExportError::RetargetFailure { frame: index, reason: e.to_string() })?
            .clone();

        let physics = engine.physics();
        physics.set_pose(&pose).map_err(|e| ExportError::RetargetFailure {
            frame: index,
            reason: format!("physics state rejected pose: {}", e),
        })?;
        physics.forward().map_err(|e| ExportError::RetargetFailure {
            frame: index,
            reason: format!("forward kinematics failed: {}", e),
        })?;

        if let Some(session) = video.as_deref_mut() {
            session.render_frame(index, &*physics)?;
        }

        if accumulate {
            poses.push(pose);
        }

        if (index + 1) % 100 == 0 {
            debug!("Retargeted {}/{} frames", index + 1, frames.len());
        }
    }

    Ok(poses)
}
