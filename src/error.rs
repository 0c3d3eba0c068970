use thiserror::Error;

/// Main error type for the retarget-render library
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid output format: {details}")]
    InvalidFormat { details: String },

    #[error("Invalid input type: {details}")]
    InvalidInputType { details: String },

    #[error("Invalid configuration: {details}")]
    InvalidConfiguration { details: String },

    #[error("Missing asset: {path}")]
    MissingAsset { path: String },

    #[error("Retargeting failed at frame {frame}: {reason}")]
    RetargetFailure { frame: usize, reason: String },

    #[error("Rendering failed: {reason}")]
    RenderFailure { reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Trajectory serialization failed: {0}")]
    Serialization(#[from] serde_pickle::Error),

    #[error("Worker failed: {reason}")]
    Worker { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Failure reported by an external collaborator: a retargeting engine, its
/// physics state, a frame renderer or a video sink.
///
/// Collaborators only describe what went wrong; the pipeline decides which
/// [`ExportError`] variant the failure becomes and attaches the frame index.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Convenience type alias for Results using ExportError
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    pub fn invalid_format<S: Into<String>>(details: S) -> Self {
        Self::InvalidFormat { details: details.into() }
    }

    pub fn invalid_input_type<S: Into<String>>(details: S) -> Self {
        Self::InvalidInputType { details: details.into() }
    }

    pub fn invalid_configuration<S: Into<String>>(details: S) -> Self {
        Self::InvalidConfiguration { details: details.into() }
    }

    pub fn render_failure<S: Into<String>>(reason: S) -> Self {
        Self::RenderFailure { reason: reason.into() }
    }

    /// Whether the failure was caused by the request itself rather than by the
    /// service. Transport layers map these to a client error status.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat { .. }
                | Self::InvalidInputType { .. }
                | Self::InvalidConfiguration { .. }
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidFormat { details } => {
                format!("{}. Accepted output formats: mp4, traj, csv (or 'both' for mp4,traj).", details)
            }
            Self::MissingAsset { path } => {
                format!(
                    "SMPL-X model directory missing: {}. Place SMPLX_NEUTRAL.pkl etc. under the body model directory or set SMPLX_MODEL_DIR.",
                    path
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
