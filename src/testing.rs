//! In-crate fakes for the external collaborators, shared by unit tests.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use glam::{DQuat, DVec3};

use crate::error::{BackendError, Result};
use crate::motion::source::{FrameSource, InputFamily, LoadedMotion};
use crate::motion::types::{FrameSequence, JointPose, MotionFrame, RobotPose};
use crate::render::backend::RenderBackend;
use crate::render::encoder::VideoSink;
use crate::render::renderer::FrameRenderer;
use crate::render::types::{Frame, TrackingCamera};
use crate::retarget::{EngineFactory, EngineSpec, PhysicsState, RetargetEngine};

/// A pelvis drifting along +X with a slow yaw, `count` frames at 30 fps
pub fn walking_frames(count: usize) -> FrameSequence {
    let frames = (0..count)
        .map(|i| {
            let t = i as f64 / 30.0;
            let pelvis = JointPose::new(DVec3::new(t, 0.0, 0.9), DQuat::from_rotation_z(0.2 * t));
            let head = JointPose::new(pelvis.position + DVec3::new(0.0, 0.0, 0.7), pelvis.orientation);
            [("pelvis", pelvis), ("head", head)].into_iter().collect::<MotionFrame>()
        })
        .collect();
    FrameSequence::new(frames, 30).unwrap()
}

/// Bodies derived from the root position only
pub struct FakePhysics {
    qpos: Vec<f64>,
    bodies: Vec<(String, DVec3)>,
    max_size: (u32, u32),
}

impl FakePhysics {
    pub fn new(max_size: (u32, u32)) -> Self {
        Self { qpos: Vec::new(), bodies: Vec::new(), max_size }
    }
}

impl PhysicsState for FakePhysics {
    fn set_pose(&mut self, pose: &RobotPose) -> std::result::Result<(), BackendError> {
        self.qpos = pose.as_slice().to_vec();
        Ok(())
    }

    fn forward(&mut self) -> std::result::Result<(), BackendError> {
        let root = DVec3::new(self.qpos[0], self.qpos[1], self.qpos[2]);
        self.bodies = vec![
            ("pelvis".to_string(), root),
            ("torso_link".to_string(), root + DVec3::new(0.0, 0.0, 0.4)),
        ];
        Ok(())
    }

    fn body_position(&self, body: &str) -> std::result::Result<DVec3, BackendError> {
        self.bodies
            .iter()
            .find(|(name, _)| name == body)
            .map(|(_, p)| *p)
            .ok_or_else(|| BackendError::new(format!("unknown body '{}'", body)))
    }

    fn body_positions(&self) -> Vec<(String, DVec3)> {
        self.bodies.clone()
    }

    fn max_offscreen_size(&self) -> (u32, u32) {
        self.max_size
    }
}

/// Deterministic engine: root follows the pelvis, joints follow frame content
pub struct ScriptedEngine {
    physics: FakePhysics,
    buffer: RobotPose,
    dof: usize,
    fail_at: Option<usize>,
    calls: usize,
}

impl RetargetEngine for ScriptedEngine {
    fn retarget(&mut self, frame: &MotionFrame) -> std::result::Result<&RobotPose, BackendError> {
        let index = self.calls;
        self.calls += 1;
        if self.fail_at == Some(index) {
            return Err(BackendError::new("solver diverged"));
        }

        let pelvis = frame
            .get("pelvis")
            .copied()
            .ok_or_else(|| BackendError::new("frame has no pelvis"))?;
        let joints: Vec<f64> = (0..self.dof)
            .map(|j| (pelvis.position.x * (j + 1) as f64).sin())
            .collect();

        // reuse one buffer so callers must copy what they keep
        self.buffer = RobotPose::from_parts(pelvis.position.to_array(), pelvis.orientation_wxyz(), &joints);
        Ok(&self.buffer)
    }

    fn physics(&mut self) -> &mut dyn PhysicsState {
        &mut self.physics
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedEngineFactory {
    pub dof: usize,
    pub fail_at: Option<usize>,
    pub max_size: (u32, u32),
    pub built: Arc<Mutex<Vec<EngineSpec>>>,
}

impl ScriptedEngineFactory {
    pub fn new(dof: usize) -> Self {
        Self { dof, fail_at: None, max_size: (0, 0), built: Arc::default() }
    }

    pub fn failing_at(mut self, frame: usize) -> Self {
        self.fail_at = Some(frame);
        self
    }

    pub fn with_max_size(mut self, width: u32, height: u32) -> Self {
        self.max_size = (width, height);
        self
    }

    pub fn engine(&self) -> ScriptedEngine {
        ScriptedEngine {
            physics: FakePhysics::new(self.max_size),
            buffer: RobotPose::from_parts([0.0; 3], [1.0, 0.0, 0.0, 0.0], &[]),
            dof: self.dof,
            fail_at: self.fail_at,
            calls: 0,
        }
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn build(&self, spec: &EngineSpec) -> std::result::Result<Box<dyn RetargetEngine>, BackendError> {
        self.built.lock().unwrap().push(spec.clone());
        Ok(Box::new(self.engine()))
    }
}

/// Returns fixed frames and remembers whether the staged input existed
pub struct StaticFrameSource {
    motion: LoadedMotion,
    pub seen_inputs: Mutex<Vec<(PathBuf, bool)>>,
}

impl StaticFrameSource {
    pub fn new(frames: FrameSequence) -> Self {
        Self {
            motion: LoadedMotion { frames, human_height: 1.75 },
            seen_inputs: Mutex::new(Vec::new()),
        }
    }
}

impl FrameSource for StaticFrameSource {
    fn load(&self, input: &Path, _family: InputFamily, _body_model_dir: &Path, _target_fps: u32) -> Result<LoadedMotion> {
        self.seen_inputs.lock().unwrap().push((input.to_path_buf(), input.exists()));
        Ok(self.motion.clone())
    }
}

#[derive(Debug, Default)]
pub struct RenderLog {
    pub renderer_size: Option<(u32, u32)>,
    pub rendered: usize,
    pub lookats: Vec<DVec3>,
    pub renderer_closed: usize,
    pub sink_closed: usize,
}

/// Renders flat frames and writes a small text "video": a size header then
/// one line per frame
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub log: Arc<Mutex<RenderLog>>,
    pub fail_render_at: Option<usize>,
    pub fail_renderer_close: bool,
    pub fail_sink_close: bool,
}

struct RecordingRenderer {
    width: u32,
    height: u32,
    log: Arc<Mutex<RenderLog>>,
    fail_at: Option<usize>,
    fail_close: bool,
}

impl FrameRenderer for RecordingRenderer {
    fn render(&mut self, _state: &dyn PhysicsState, camera: &TrackingCamera) -> std::result::Result<Frame, BackendError> {
        let mut log = self.log.lock().unwrap();
        if self.fail_at == Some(log.rendered) {
            return Err(BackendError::new("context lost"));
        }
        log.rendered += 1;
        log.lookats.push(camera.lookat);
        Ok(Frame::new_filled(self.width, self.height, [10, 20, 30]))
    }

    fn close(&mut self) -> std::result::Result<(), BackendError> {
        self.log.lock().unwrap().renderer_closed += 1;
        if self.fail_close {
            return Err(BackendError::new("context already destroyed"));
        }
        Ok(())
    }
}

struct RecordingSink {
    file: File,
    log: Arc<Mutex<RenderLog>>,
    fail_close: bool,
}

impl VideoSink for RecordingSink {
    fn append(&mut self, frame: &Frame) -> std::result::Result<(), BackendError> {
        writeln!(self.file, "frame {}x{}", frame.width(), frame.height())?;
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), BackendError> {
        self.file.flush()?;
        self.log.lock().unwrap().sink_closed += 1;
        if self.fail_close {
            return Err(BackendError::new("encoder exited with status 1"));
        }
        Ok(())
    }
}

impl RenderBackend for RecordingBackend {
    fn open_renderer(&self, width: u32, height: u32) -> std::result::Result<Box<dyn FrameRenderer>, BackendError> {
        self.log.lock().unwrap().renderer_size = Some((width, height));
        Ok(Box::new(RecordingRenderer {
            width,
            height,
            log: Arc::clone(&self.log),
            fail_at: self.fail_render_at,
            fail_close: self.fail_renderer_close,
        }))
    }

    fn open_sink(
        &self,
        path: &Path,
        fps: u32,
        width: u32,
        height: u32,
    ) -> std::result::Result<Box<dyn VideoSink>, BackendError> {
        let mut file = File::create(path)?;
        writeln!(file, "{}x{}@{}", width, height, fps)?;
        Ok(Box::new(RecordingSink {
            file,
            log: Arc::clone(&self.log),
            fail_close: self.fail_sink_close,
        }))
    }
}
