// output.rs - Naming and writing of processed images

use crate::error::OutputError;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Folder the processed images live under inside the output
pub const PROCESSED_DIR: &str = "processed_images";

/// Human readable byte count, base 1024 with two decimals
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// `YYYYMMDD_HHMMSS`
pub fn timestamp_string(time: &NaiveDateTime) -> String {
    time.format("%Y%m%d_%H%M%S").to_string()
}

/// `<folder>_compressed_<timestamp>`
pub fn archive_name(folder: &str, time: &NaiveDateTime) -> String {
    format!("{}_compressed_{}", folder, timestamp_string(time))
}

/// Write every `(name, bytes)` pair under `root/processed_images/`.
///
/// Names are `/`-separated paths relative to the input, so nested folders
/// are recreated. Returns the folder written to.
pub fn write_outputs<'a, I>(root: &Path, outputs: I) -> Result<PathBuf, OutputError>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let dir = root.join(PROCESSED_DIR);
    fs::create_dir_all(&dir)?;

    let mut written = HashSet::new();
    for (name, bytes) in outputs {
        let relative = output_path(name)?;
        if !written.insert(relative.clone()) {
            return Err(OutputError::DuplicateName(name.to_string()));
        }
        let path = dir.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), size = bytes.len(), "wrote output");
    }

    Ok(dir)
}

/// Relative path for `name`, refusing anything that could leave the folder
fn output_path(name: &str) -> Result<PathBuf, OutputError> {
    let path = Path::new(name);
    let mut components = path.components().peekable();
    if components.peek().is_none()
        || !components.all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(OutputError::InvalidName(name.to_string()));
    }
    Ok(path.to_path_buf())
}
