use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::export::{ArtifactStem, CsvLayout, DeliveredArtifact, OutputAssembler, OutputFormat, OutputRequest};
use crate::motion::coords::{correct_frames, CoordFix};
use crate::motion::source::{FrameSource, InputFamily};
use crate::motion::types::{FrameSequence, RobotPose};
use crate::pipeline::retarget_loop::retarget_frames;
use crate::render::backend::RenderBackend;
use crate::render::session::RenderSession;
use crate::render::types::RenderConfig;
use crate::retarget::{EngineFactory, EngineSpec, RetargetEngine};

/// One validated unit of work for [`ExportPipeline::run`]
#[derive(Debug, Clone)]
pub struct PipelineJob {
    /// Staged input file
    pub input: PathBuf,
    pub family: InputFamily,
    pub coord_fix: CoordFix,
    pub robot: String,
    pub request: OutputRequest,

    /// Requested video parameters, before device clamping. Present exactly
    /// when the request includes mp4.
    pub render: Option<RenderConfig>,

    pub stem: ArtifactStem,
}

/// The retarget-and-export pipeline
///
/// Runs synchronously on the calling thread:
/// 1. Frame Loading - parse the staged input into a resampled sequence
/// 2. Coordinate Fix - rotate frames into the z-up convention when asked
/// 3. Retarget Loop - solve, sync physics, optionally render, per frame
/// 4. Output Assembly - trajectory, table and archive files
///
/// Any failure deletes every file carrying the job's stem before it is
/// returned.
pub struct ExportPipeline {
    config: Arc<Config>,
    frame_source: Arc<dyn FrameSource>,
    engines: Arc<dyn EngineFactory>,
    render_backend: Arc<dyn RenderBackend>,
}

impl ExportPipeline {
    pub fn new(
        config: Arc<Config>,
        frame_source: Arc<dyn FrameSource>,
        engines: Arc<dyn EngineFactory>,
        render_backend: Arc<dyn RenderBackend>,
    ) -> Self {
        Self { config, frame_source, engines, render_backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a job to completion, leaving no partial artifacts on failure
    pub fn run(&self, job: &PipelineJob) -> Result<DeliveredArtifact> {
        let result = self.execute(job);

        if let Err(e) = &result {
            let removed = job.stem.cleanup();
            warn!("Export {} failed: {} (removed {} partial artifacts)", job.stem.stem(), e, removed);
        }

        result
    }

    fn execute(&self, job: &PipelineJob) -> Result<DeliveredArtifact> {
        let (human_height, frames) = self.load_frames(job)?;

        let spec = EngineSpec::new(human_height, job.robot.as_str());
        let mut engine = self.engines.build(&spec).map_err(|e| {
            ExportError::invalid_configuration(format!(
                "cannot build retargeting engine for robot '{}': {}",
                job.robot, e
            ))
        })?;

        info!("Retargeting {} frames at {} fps onto {}", frames.len(), frames.fps(), job.robot);
        let (poses, video) = self.retarget_and_render(engine.as_mut(), &frames, job)?;

        let assembler = OutputAssembler::new(
            &job.request,
            &job.stem,
            &job.robot,
            CsvLayout::from(&self.config.export),
        );
        let outcome = assembler.assemble(&poses, frames.fps(), video.as_deref())?;
        let delivered = assembler.deliver(&outcome)?;

        info!("Export {} complete: {:?}", job.stem.stem(), delivered.path);
        Ok(delivered)
    }

    fn load_frames(&self, job: &PipelineJob) -> Result<(f64, FrameSequence)> {
        let body_model_dir = &self.config.paths.body_model_dir;
        if !body_model_dir.exists() {
            return Err(ExportError::MissingAsset { path: body_model_dir.display().to_string() });
        }

        job.coord_fix.validate_for(job.family)?;

        let loaded = self.frame_source.load(
            &job.input,
            job.family,
            body_model_dir,
            self.config.export.target_fps,
        )?;

        Ok((loaded.human_height, correct_frames(loaded.frames, job.coord_fix)))
    }

    /// Run the frame loop, wrapping it in a render session when mp4 is
    /// requested. The session is released on both paths.
    fn retarget_and_render(
        &self,
        engine: &mut dyn RetargetEngine,
        frames: &FrameSequence,
        job: &PipelineJob,
    ) -> Result<(Vec<RobotPose>, Option<PathBuf>)> {
        let accumulate = job.request.needs_poses();

        let Some(requested) = job.render.clone().filter(|_| job.request.needs_video()) else {
            return Ok((retarget_frames(engine, frames, accumulate, None)?, None));
        };

        let view = requested.clone().clamped_to(engine.physics().max_offscreen_size());
        if (view.width, view.height) != (requested.width, requested.height) {
            info!(
                "Clamped render size {}x{} to {}x{}",
                requested.width, requested.height, view.width, view.height
            );
        }

        let path = job.stem.path_for(OutputFormat::Mp4);
        let mut session = RenderSession::open(self.render_backend.as_ref(), view, &path, frames.fps())?;

        match retarget_frames(engine, frames, accumulate, Some(&mut session)) {
            Ok(poses) => {
                session.finish()?;
                Ok((poses, Some(path)))
            }
            Err(e) => {
                session.abort();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RobotProfile;
    use crate::export::TrajectoryRecord;
    use crate::motion::types::MotionFrame;
    use crate::testing::{walking_frames, RecordingBackend, ScriptedEngineFactory, StaticFrameSource};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        config: Arc<Config>,
        backend: RecordingBackend,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let mut config = Config::default();
            config.paths.body_model_dir = dir.path().join("body_models");
            config.paths.output_dir = dir.path().join("videos");
            std::fs::create_dir_all(&config.paths.body_model_dir).unwrap();
            Self { _dir: dir, config: Arc::new(config), backend: RecordingBackend::default() }
        }

        fn pipeline(&self, frames: FrameSequence, engines: ScriptedEngineFactory) -> ExportPipeline {
            ExportPipeline::new(
                Arc::clone(&self.config),
                Arc::new(StaticFrameSource::new(frames)),
                Arc::new(engines),
                Arc::new(self.backend.clone()),
            )
        }

        fn job(&self, formats: &str, robot: &str, size: (u32, u32)) -> PipelineJob {
            let request = OutputRequest::parse(formats).unwrap();
            let render = request.needs_video().then(|| {
                RenderConfig::for_robot(
                    &self.config.render,
                    &RobotProfile::new("pelvis", 2.0),
                    Some(size.0),
                    Some(size.1),
                )
            });
            PipelineJob {
                input: PathBuf::from("/staged/input.pt"),
                family: InputFamily::Gvhmr,
                coord_fix: CoordFix::None,
                robot: robot.to_string(),
                request,
                render,
                stem: ArtifactStem::allocate(&self.config.paths.output_dir).unwrap(),
            }
        }
    }

    #[test]
    fn test_mid_loop_failure_leaves_no_artifacts() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(walking_frames(20), ScriptedEngineFactory::new(29).failing_at(7));
        let job = fixture.job("mp4,traj,csv", "unitree_g1", (64, 64));

        let err = pipeline.run(&job).unwrap_err();
        assert!(matches!(err, ExportError::RetargetFailure { frame: 7, .. }));
        assert!(job.stem.existing_files().is_empty());

        let log = fixture.backend.log.lock().unwrap();
        assert_eq!(log.rendered, 7);
        assert_eq!(log.renderer_closed, 1);
        assert_eq!(log.sink_closed, 1);
    }

    #[test]
    fn test_release_errors_do_not_mask_the_failure() {
        let mut fixture = Fixture::new();
        fixture.backend.fail_renderer_close = true;
        fixture.backend.fail_sink_close = true;
        let pipeline = fixture.pipeline(walking_frames(10), ScriptedEngineFactory::new(29).failing_at(4));
        let job = fixture.job("mp4,csv", "unitree_g1", (32, 32));

        let err = pipeline.run(&job).unwrap_err();
        assert!(matches!(err, ExportError::RetargetFailure { frame: 4, .. }), "got {err}");
        assert!(job.stem.existing_files().is_empty());

        let log = fixture.backend.log.lock().unwrap();
        assert_eq!(log.renderer_closed, 1);
        assert_eq!(log.sink_closed, 1);
    }

    #[test]
    fn test_sink_finalize_failure_fails_the_run() {
        let mut fixture = Fixture::new();
        fixture.backend.fail_sink_close = true;
        let pipeline = fixture.pipeline(walking_frames(3), ScriptedEngineFactory::new(29));
        let job = fixture.job("mp4", "unitree_g1", (32, 32));

        let err = pipeline.run(&job).unwrap_err();
        assert!(matches!(err, ExportError::RenderFailure { .. }));
        assert!(job.stem.existing_files().is_empty());
        assert_eq!(fixture.backend.log.lock().unwrap().sink_closed, 1);
    }

    #[test]
    fn test_render_size_clamped_to_device_limit() {
        let fixture = Fixture::new();
        let engines = ScriptedEngineFactory::new(29).with_max_size(640, 480);
        let pipeline = fixture.pipeline(walking_frames(3), engines);
        let job = fixture.job("mp4", "unitree_g1", (1920, 1080));

        let delivered = pipeline.run(&job).unwrap();
        assert_eq!(delivered.media_type, "video/mp4");
        assert_eq!(fixture.backend.log.lock().unwrap().renderer_size, Some((640, 480)));

        let video = std::fs::read_to_string(&delivered.path).unwrap();
        let mut lines = video.lines();
        assert_eq!(lines.next(), Some("640x480@30"));
        assert_eq!(lines.filter(|l| *l == "frame 640x480").count(), 3);
    }

    #[test]
    fn test_mp4_and_csv_bundle() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(walking_frames(5), ScriptedEngineFactory::new(29));
        let job = fixture.job("mp4,csv", "unitree_g1", (32, 32));

        let delivered = pipeline.run(&job).unwrap();
        assert_eq!(delivered.path, job.stem.bundle_path());

        let archive = zip::ZipArchive::new(std::fs::File::open(&delivered.path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&format!("{}.mp4", job.stem.stem()).as_str()));
        assert!(names.contains(&format!("{}.csv", job.stem.stem()).as_str()));
    }

    #[test]
    fn test_csv_for_other_robot_fails_and_cleans_up() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(walking_frames(4), ScriptedEngineFactory::new(19));
        let job = fixture.job("traj,csv", "unitree_h1", (32, 32));

        let err = pipeline.run(&job).unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfiguration { .. }));
        assert!(job.stem.existing_files().is_empty());
    }

    #[test]
    fn test_csv_with_wrong_dof_fails() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(walking_frames(4), ScriptedEngineFactory::new(23));
        let job = fixture.job("csv", "unitree_g1", (32, 32));

        let err = pipeline.run(&job).unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfiguration { .. }));
        assert!(!job.stem.path_for(OutputFormat::Csv).exists());
    }

    #[test]
    fn test_trajectory_only_skips_rendering() {
        let fixture = Fixture::new();
        let engines = ScriptedEngineFactory::new(29);
        let pipeline = fixture.pipeline(walking_frames(6), engines.clone());
        let job = fixture.job("traj", "unitree_g1", (32, 32));

        let delivered = pipeline.run(&job).unwrap();
        assert_eq!(delivered.media_type, "application/octet-stream");
        assert!(fixture.backend.log.lock().unwrap().renderer_size.is_none());
        assert_eq!(*engines.built.lock().unwrap(), vec![EngineSpec::new(1.75, "unitree_g1")]);

        let record = TrajectoryRecord::read_pickle(&delivered.path).unwrap();
        assert_eq!(record.frame_count(), 6);
        assert_eq!(record.dof(), Some(29));
    }

    #[test]
    fn test_missing_body_models() {
        let fixture = Fixture::new();
        std::fs::remove_dir_all(&fixture.config.paths.body_model_dir).unwrap();
        let pipeline = fixture.pipeline(walking_frames(2), ScriptedEngineFactory::new(29));
        let job = fixture.job("traj", "unitree_g1", (32, 32));

        let err = pipeline.run(&job).unwrap_err();
        assert!(matches!(err, ExportError::MissingAsset { .. }));
    }

    #[test]
    fn test_coord_fix_changes_retargeted_root() {
        let fixture = Fixture::new();
        let frames = walking_frames(3);

        let plain = fixture.pipeline(frames.clone(), ScriptedEngineFactory::new(29));
        let mut job = fixture.job("traj", "unitree_g1", (32, 32));
        job.family = InputFamily::SmplxNpz;
        let baseline = TrajectoryRecord::read_pickle(&plain.run(&job).unwrap().path).unwrap();

        let fixed = fixture.pipeline(frames, ScriptedEngineFactory::new(29));
        let mut job = fixture.job("traj", "unitree_g1", (32, 32));
        job.family = InputFamily::SmplxNpz;
        job.coord_fix = CoordFix::YupToZup;
        let corrected = TrajectoryRecord::read_pickle(&fixed.run(&job).unwrap().path).unwrap();

        assert_ne!(baseline.root_pos, corrected.root_pos);
        // (x, y, z) -> (x, -z, y)
        let [x, y, z] = baseline.root_pos[1];
        assert_eq!(corrected.root_pos[1], [x, -z, y]);
    }

    #[test]
    fn test_empty_sequence_produces_empty_trajectory() {
        let fixture = Fixture::new();
        let frames = FrameSequence::new(Vec::<MotionFrame>::new(), 30).unwrap();
        let pipeline = fixture.pipeline(frames, ScriptedEngineFactory::new(29));
        let job = fixture.job("traj", "unitree_g1", (32, 32));

        let delivered = pipeline.run(&job).unwrap();
        let record = TrajectoryRecord::read_pickle(&delivered.path).unwrap();
        assert_eq!(record.frame_count(), 0);
    }
}
