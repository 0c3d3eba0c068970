//! # Export Module
//!
//! Output negotiation and artifact assembly: which formats a request wants,
//! where each artifact lives, how trajectories and tables are written, and
//! when results are bundled into one archive.

pub mod artifacts;
pub mod assembler;
pub mod bundle;
pub mod format;
pub mod tabular;
pub mod trajectory;

pub use artifacts::ArtifactStem;
pub use assembler::{DeliveredArtifact, ExportOutcome, OutputAssembler};
pub use format::{OutputFormat, OutputRequest};
pub use tabular::CsvLayout;
pub use trajectory::TrajectoryRecord;
