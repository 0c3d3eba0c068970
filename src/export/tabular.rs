use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::export::trajectory::TrajectoryRecord;

/// Decimal places written for every CSV value
pub const CSV_PRECISION: usize = 8;

/// Robot and joint layout the CSV consumer understands
///
/// The downstream motion-imitation tooling reads a fixed 29-DoF Unitree G1
/// layout: `root_pos(3), root_rot xyzw(4), joints(29)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLayout {
    pub robot: String,
    pub dof: usize,
}

impl From<&ExportConfig> for CsvLayout {
    fn from(config: &ExportConfig) -> Self {
        Self {
            robot: config.csv_robot.clone(),
            dof: config.csv_dof,
        }
    }
}

impl CsvLayout {
    /// Columns per row
    pub fn width(&self) -> usize {
        3 + 4 + self.dof
    }

    /// Check the robot alone, before any frame is processed
    pub fn check_robot(&self, robot: &str) -> Result<()> {
        if robot != self.robot {
            return Err(ExportError::invalid_configuration(format!(
                "csv export is currently supported only for robot='{}'",
                self.robot
            )));
        }
        Ok(())
    }

    /// Check robot and joint count of a finished record
    pub fn check(&self, robot: &str, record: &TrajectoryRecord) -> Result<()> {
        self.check_robot(robot)?;

        let dof = record.dof().unwrap_or(self.dof);
        if dof != self.dof {
            return Err(ExportError::invalid_configuration(format!(
                "csv export expected {} joint DoF for {}, got {}",
                self.dof, self.robot, dof
            )));
        }
        Ok(())
    }

    /// Validate, then write one row per frame. Nothing is written when the
    /// record does not fit the layout.
    pub fn write(&self, robot: &str, record: &TrajectoryRecord, path: &Path) -> Result<()> {
        self.check(robot, record)?;

        let mut writer = BufWriter::new(File::create(path)?);
        for ((root_pos, root_rot), dof_pos) in record
            .root_pos
            .iter()
            .zip(&record.root_rot)
            .zip(&record.dof_pos)
        {
            let row = root_pos.iter().chain(root_rot.iter()).chain(dof_pos.iter());
            write_row(&mut writer, row)?;
        }
        writer.flush()?;

        debug!("Wrote {} csv rows to {:?}", record.frame_count(), path);
        Ok(())
    }
}

fn write_row<'a, W, I>(writer: &mut W, values: I) -> std::io::Result<()>
where
    W: Write,
    I: Iterator<Item = &'a f64>,
{
    for (i, value) in values.enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        write!(writer, "{:.*}", CSV_PRECISION, value)?;
    }
    writer.write_all(b"\n")
}
