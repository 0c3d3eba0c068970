use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ExportError, Result};
use crate::motion::types::FrameSequence;

/// Supported families of human-motion input files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFamily {
    /// Video-based pose predictions stored as a torch checkpoint (`.pt`)
    Gvhmr,
    /// SMPL-X parameter archive (`.npz`)
    SmplxNpz,
}

const SUPPORTED_FAMILIES: &str = "unsupported input_type. Currently supported: gvhmr, smplx_npz";

impl InputFamily {
    /// File extension an upload of this family must carry
    pub fn required_extension(&self) -> &'static str {
        match self {
            Self::Gvhmr => "pt",
            Self::SmplxNpz => "npz",
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Gvhmr => "gvhmr",
            Self::SmplxNpz => "smplx_npz",
        }
    }

    /// Whether frames of this family already arrive z-up. A coordinate fix
    /// on such input is rejected.
    pub fn is_native_zup(&self) -> bool {
        matches!(self, Self::Gvhmr)
    }

    /// Reject file names whose extension does not match the family
    pub fn validate_file_name(&self, file_name: &str) -> Result<()> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str());

        if extension == Some(self.required_extension()) {
            Ok(())
        } else {
            Err(ExportError::invalid_input_type(format!(
                "Input must be a .{} file for input_type={}",
                self.required_extension(),
                self.token()
            )))
        }
    }
}

impl FromStr for InputFamily {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gvhmr" => Ok(Self::Gvhmr),
            "smplx_npz" | "smplx" => Ok(Self::SmplxNpz),
            _ => Err(ExportError::invalid_input_type(SUPPORTED_FAMILIES)),
        }
    }
}

impl fmt::Display for InputFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Frames parsed from an input file together with the estimated performer height
#[derive(Debug, Clone)]
pub struct LoadedMotion {
    pub frames: FrameSequence,
    pub human_height: f64,
}

/// Parses body-model input files into resampled frame sequences
///
/// Implementations own body-model loading and height estimation; the pipeline
/// only relies on the returned frames being in time order at `target_fps`.
pub trait FrameSource: Send + Sync {
    fn load(
        &self,
        input: &Path,
        family: InputFamily,
        body_model_dir: &Path,
        target_fps: u32,
    ) -> Result<LoadedMotion>;
}
