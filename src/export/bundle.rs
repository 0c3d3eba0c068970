use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{ExportError, Result};

/// Pack `files` into a deflate-compressed zip at `archive_path`
///
/// Entries are stored under their bare file names, in the given order.
pub fn write_bundle(archive_path: &Path, files: &[PathBuf]) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(archive_path)?);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for path in files {
        let name = entry_name(path)?;
        zip.start_file(name.as_str(), options)?;

        let mut reader = BufReader::new(File::open(path)?);
        io::copy(&mut reader, &mut zip)?;
        debug!("Bundled {:?} as {}", path, name);
    }

    zip.finish()?;
    Ok(())
}

fn entry_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ExportError::invalid_configuration(format!("artifact path {:?} has no file name", path)))
}
