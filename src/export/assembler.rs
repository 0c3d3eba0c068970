use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ExportError, Result};
use crate::export::artifacts::ArtifactStem;
use crate::export::bundle::write_bundle;
use crate::export::format::{OutputFormat, OutputRequest};
use crate::export::tabular::CsvLayout;
use crate::export::trajectory::TrajectoryRecord;
use crate::motion::types::RobotPose;

const BUNDLE_MEDIA_TYPE: &str = "application/zip";

/// Artifacts produced for one request, in request order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOutcome {
    artifacts: Vec<(OutputFormat, PathBuf)>,
}

impl ExportOutcome {
    pub fn get(&self, format: OutputFormat) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, path)| path.as_path())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(|(_, path)| path.as_path())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    fn push(&mut self, format: OutputFormat, path: PathBuf) {
        self.artifacts.push((format, path));
    }
}

/// The single file handed back to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredArtifact {
    pub path: PathBuf,
    pub media_type: &'static str,
    pub file_name: String,
}

impl DeliveredArtifact {
    fn new(path: PathBuf, media_type: &'static str) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, media_type, file_name }
    }
}

/// Turns accumulated poses into the requested files
pub struct OutputAssembler<'a> {
    request: &'a OutputRequest,
    stem: &'a ArtifactStem,
    robot: &'a str,
    csv: CsvLayout,
}

impl<'a> OutputAssembler<'a> {
    pub fn new(request: &'a OutputRequest, stem: &'a ArtifactStem, robot: &'a str, csv: CsvLayout) -> Self {
        Self { request, stem, robot, csv }
    }

    /// Write trajectory and table artifacts and collect the video written by
    /// the render loop
    ///
    /// Table constraints are checked before any file is written here.
    pub fn assemble(&self, poses: &[RobotPose], fps: u32, video: Option<&Path>) -> Result<ExportOutcome> {
        let record = if self.request.needs_poses() {
            Some(TrajectoryRecord::from_poses(poses, fps)?)
        } else {
            None
        };

        if self.request.contains(OutputFormat::Csv) {
            if let Some(record) = &record {
                self.csv.check(self.robot, record)?;
            }
        }

        let mut outcome = ExportOutcome::default();
        for &format in self.request.formats() {
            let path = self.stem.path_for(format);
            match format {
                OutputFormat::Mp4 => {
                    let video = video.ok_or_else(|| {
                        ExportError::render_failure("video output was requested but never rendered")
                    })?;
                    outcome.push(format, video.to_path_buf());
                }
                OutputFormat::Traj => {
                    accumulated(&record)?.write_pickle(&path)?;
                    outcome.push(format, path);
                }
                OutputFormat::Csv => {
                    self.csv.write(self.robot, accumulated(&record)?, &path)?;
                    outcome.push(format, path);
                }
            }
            debug!("Produced {} artifact", format);
        }

        Ok(outcome)
    }

    /// Pick the file to return: the artifact itself for a single format,
    /// otherwise a zip of every produced artifact
    pub fn deliver(&self, outcome: &ExportOutcome) -> Result<DeliveredArtifact> {
        if let Some(format) = self.request.single() {
            let path = outcome.get(format).ok_or_else(|| {
                ExportError::invalid_configuration(format!(
                    "Requested output format '{}' was not generated",
                    format
                ))
            })?;
            return Ok(DeliveredArtifact::new(path.to_path_buf(), format.media_type()));
        }

        let archive = self.stem.bundle_path();
        let files: Vec<PathBuf> = outcome.paths().map(Path::to_path_buf).collect();
        write_bundle(&archive, &files)?;

        info!("Bundled {} artifacts into {:?}", files.len(), archive);
        Ok(DeliveredArtifact::new(archive, BUNDLE_MEDIA_TYPE))
    }
}

fn accumulated(record: &Option<TrajectoryRecord>) -> Result<&TrajectoryRecord> {
    record
        .as_ref()
        .ok_or_else(|| ExportError::invalid_configuration("poses were not accumulated for this request"))
}
