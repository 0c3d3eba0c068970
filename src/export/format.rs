use std::fmt;
use std::str::FromStr;

use crate::error::{ExportError, Result};

/// Format used when a request names none
pub const DEFAULT_FORMAT: &str = "mp4";

/// One exportable artifact kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputFormat {
    /// Tracked-camera video
    Mp4,
    /// Pickled trajectory record
    Traj,
    /// Per-frame table of root pose and joint positions
    Csv,
}

impl OutputFormat {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Traj => "traj",
            Self::Csv => "csv",
        }
    }

    /// File extension of the artifact, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Traj => "pkl",
            Self::Csv => "csv",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Traj => "application/octet-stream",
            Self::Csv => "text/csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "traj" => Ok(Self::Traj),
            "csv" => Ok(Self::Csv),
            other => Err(ExportError::invalid_format(format!("Invalid output formats: {}", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Validated, ordered and deduplicated set of requested formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    formats: Vec<OutputFormat>,
}

impl OutputRequest {
    /// Parse a comma separated token list
    ///
    /// Tokens are trimmed and case-insensitive; `both` expands to `mp4,traj`.
    /// Duplicates keep their first position. An empty result or any unknown
    /// token is an [`ExportError::InvalidFormat`].
    pub fn parse(raw: &str) -> Result<Self> {
        let mut tokens: Vec<String> = Vec::new();
        for token in raw.split(',').map(|t| t.trim().to_ascii_lowercase()) {
            match token.as_str() {
                "" => {}
                "both" => {
                    tokens.push("mp4".to_string());
                    tokens.push("traj".to_string());
                }
                _ => tokens.push(token),
            }
        }

        let mut unique: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !unique.contains(&token) {
                unique.push(token);
            }
        }

        if unique.is_empty() {
            return Err(ExportError::invalid_format("No valid output format provided"));
        }

        let invalid: Vec<&str> = unique
            .iter()
            .map(String::as_str)
            .filter(|t| t.parse::<OutputFormat>().is_err())
            .collect();
        if !invalid.is_empty() {
            return Err(ExportError::invalid_format(format!(
                "Invalid output formats: {}",
                invalid.join(",")
            )));
        }

        let formats = unique
            .iter()
            .map(|t| t.parse::<OutputFormat>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { formats })
    }

    /// Resolve the two request fields: the first non-empty of `output_formats`
    /// and the legacy `return_format`, falling back to mp4
    pub fn from_fields(output_formats: Option<&str>, return_format: Option<&str>) -> Result<Self> {
        let raw = output_formats
            .filter(|s| !s.is_empty())
            .or(return_format.filter(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_FORMAT);
        Self::parse(raw)
    }

    pub fn formats(&self) -> &[OutputFormat] {
        &self.formats
    }

    pub fn contains(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }

    pub fn needs_video(&self) -> bool {
        self.contains(OutputFormat::Mp4)
    }

    /// Whether per-frame poses must be kept for trajectory or table output
    pub fn needs_poses(&self) -> bool {
        self.contains(OutputFormat::Traj) || self.contains(OutputFormat::Csv)
    }

    /// Exactly one format: the artifact is returned as is, never archived
    pub fn single(&self) -> Option<OutputFormat> {
        match self.formats.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl fmt::Display for OutputRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.formats.iter().map(OutputFormat::token).collect();
        f.write_str(&tokens.join(","))
    }
}
