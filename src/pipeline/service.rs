use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::task;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::export::{ArtifactStem, CsvLayout, DeliveredArtifact, OutputFormat, OutputRequest};
use crate::motion::coords::CoordFix;
use crate::motion::source::{FrameSource, InputFamily};
use crate::pipeline::runner::{ExportPipeline, PipelineJob};
use crate::render::backend::RenderBackend;
use crate::render::types::RenderConfig;
use crate::retarget::EngineFactory;

/// Input family assumed when a request does not name one
pub const DEFAULT_INPUT_TYPE: &str = "gvhmr";

const STAGING_PREFIX: &str = "motion-";

/// One conversion request as received from the transport layer
#[derive(Debug, Clone)]
pub struct MotionRequest {
    /// Name of the uploaded file, used only for its extension
    pub file_name: String,
    pub contents: Vec<u8>,
    pub input_type: String,
    pub robot: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub output_formats: Option<String>,
    /// Legacy single-format field, used when `output_formats` is absent
    pub return_format: Option<String>,
    pub coord_fix: Option<String>,
}

impl MotionRequest {
    pub fn new<S: Into<String>>(file_name: S, contents: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            contents,
            input_type: DEFAULT_INPUT_TYPE.to_string(),
            robot: None,
            width: None,
            height: None,
            output_formats: None,
            return_format: None,
            coord_fix: None,
        }
    }

    pub fn with_input_type<S: Into<String>>(mut self, input_type: S) -> Self {
        self.input_type = input_type.into();
        self
    }

    pub fn with_robot<S: Into<String>>(mut self, robot: S) -> Self {
        self.robot = Some(robot.into());
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_output_formats<S: Into<String>>(mut self, formats: S) -> Self {
        self.output_formats = Some(formats.into());
        self
    }

    pub fn with_return_format<S: Into<String>>(mut self, format: S) -> Self {
        self.return_format = Some(format.into());
        self
    }

    pub fn with_coord_fix<S: Into<String>>(mut self, coord_fix: S) -> Self {
        self.coord_fix = Some(coord_fix.into());
        self
    }
}

/// A request after validation, before any file exists for it
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub family: InputFamily,
    pub coord_fix: CoordFix,
    pub robot: String,
    pub request: OutputRequest,
    pub render: Option<RenderConfig>,
}

impl RequestPlan {
    /// Validate every request field against the configuration
    ///
    /// Everything that can be rejected without reading the input is rejected
    /// here, so invalid requests never stage files or allocate a stem.
    pub fn resolve(config: &Config, request: &MotionRequest) -> Result<Self> {
        let family: InputFamily = request.input_type.parse()?;
        family.validate_file_name(&request.file_name)?;

        let formats = OutputRequest::from_fields(
            request.output_formats.as_deref(),
            request.return_format.as_deref(),
        )?;

        let coord_fix = match request.coord_fix.as_deref().map(str::trim) {
            None | Some("") => CoordFix::None,
            Some(token) => token.parse()?,
        };
        coord_fix.validate_for(family)?;

        let robot = request
            .robot
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| config.export.default_robot.clone());

        if formats.contains(OutputFormat::Csv) {
            CsvLayout::from(&config.export).check_robot(&robot)?;
        }

        let render = if formats.needs_video() {
            let profile = config.robot_profile(&robot)?;
            let view = RenderConfig::for_robot(&config.render, profile, request.width, request.height);
            if view.width == 0 || view.height == 0 {
                return Err(ExportError::invalid_configuration(format!(
                    "render size must be positive, got {}x{}",
                    view.width, view.height
                )));
            }
            Some(view)
        } else {
            None
        };

        Ok(Self { family, coord_fix, robot, request: formats, render })
    }

    /// Artifact names this plan produces under `stem`, and the one returned
    pub fn artifact_names(&self, stem: &ArtifactStem) -> (Vec<PathBuf>, PathBuf) {
        let produced: Vec<PathBuf> = self.request.formats().iter().map(|&f| stem.path_for(f)).collect();
        let delivered = match self.request.single() {
            Some(format) => stem.path_for(format),
            None => stem.bundle_path(),
        };
        (produced, delivered)
    }

    fn into_job(self, input: PathBuf, stem: ArtifactStem) -> PipelineJob {
        PipelineJob {
            input,
            family: self.family,
            coord_fix: self.coord_fix,
            robot: self.robot,
            request: self.request,
            render: self.render,
            stem,
        }
    }
}

/// Request-handling boundary called by the transport layer
///
/// Validates a request, stages the uploaded bytes into a temporary file,
/// runs the pipeline on a blocking worker and returns the single artifact to
/// send back. The staged input is removed on every outcome.
pub struct MotionService {
    pipeline: Arc<ExportPipeline>,
}

impl MotionService {
    /// Create a service. The configuration is validated once here.
    pub fn new(
        config: Config,
        frame_source: Arc<dyn FrameSource>,
        engines: Arc<dyn EngineFactory>,
        render_backend: Arc<dyn RenderBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let pipeline = ExportPipeline::new(Arc::new(config), frame_source, engines, render_backend);
        Ok(Self { pipeline: Arc::new(pipeline) })
    }

    pub fn config(&self) -> &Config {
        self.pipeline.config()
    }

    /// Convert one request into its artifact
    pub async fn process(&self, request: MotionRequest) -> Result<DeliveredArtifact> {
        let plan = RequestPlan::resolve(self.config(), &request)?;
        info!(
            "Request {}: {} -> {} [{}]",
            request.file_name, plan.family, plan.robot, plan.request
        );

        let staged = stage_input(&request, plan.family)?;
        let stem = ArtifactStem::allocate(&self.config().paths.output_dir)?;
        let job = plan.into_job(staged.path().to_path_buf(), stem.clone());

        let pipeline = Arc::clone(&self.pipeline);
        let joined = task::spawn_blocking(move || pipeline.run(&job)).await;

        if let Err(e) = staged.close() {
            warn!("Failed to remove staged input: {}", e);
        }

        match joined {
            Ok(result) => result,
            Err(e) => {
                stem.cleanup();
                Err(ExportError::Worker { reason: e.to_string() })
            }
        }
    }
}

fn stage_input(request: &MotionRequest, family: InputFamily) -> Result<NamedTempFile> {
    let suffix = format!(".{}", family.required_extension());
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(&suffix)
        .tempfile()?;

    staged.write_all(&request.contents)?;
    staged.flush()?;
    Ok(staged)
}
