//! Directory listing shared by the converter and the ingestion pipeline

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use docqa_core::{Error, Result};

/// Fail fast when the configured document directory is missing
pub fn ensure_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(Error::Configuration(format!(
            "Directory {} does not exist",
            dir.display()
        )));
    }
    Ok(())
}

/// Regular files directly inside `dir`, sorted by file name
///
/// Subdirectories are not descended into. Entries that cannot be read
/// are logged and left out.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_directory(dir)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
            }
        }
    }

    Ok(files)
}
