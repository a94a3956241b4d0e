//! Batch `.docx`/`.pdf` to `.txt` conversion

use std::path::{Path, PathBuf};

use docqa_core::{ConversionReport, FileFailure, Result};

use crate::listing::list_files;
use crate::{ExtractionError, Extractor, FileKind};

/// Converts every `.docx` and `.pdf` in a directory to a `.txt` beside it
#[derive(Debug, Clone, Default)]
pub struct Converter {
    extractor: Extractor,
}

impl Converter {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    /// Path of the `.txt` written for `source`
    pub fn output_path(source: &Path) -> PathBuf {
        source.with_extension("txt")
    }

    /// Convert a single file, returning the path written
    pub fn convert_file(&self, source: &Path) -> std::result::Result<PathBuf, ExtractionError> {
        let text = self.extractor.extract(source)?;
        let target = Self::output_path(source);
        std::fs::write(&target, text.plain_text())?;
        Ok(target)
    }

    /// Convert the directory's convertible files
    ///
    /// Files of other types are ignored and not counted. A failing file is
    /// logged and counted, and the batch continues.
    pub fn convert_directory(&self, dir: &Path) -> Result<ConversionReport> {
        let mut report = ConversionReport::default();

        for path in list_files(dir)? {
            let convertible = FileKind::from_path(&path).is_some_and(|kind| kind.is_convertible());
            if !convertible {
                continue;
            }

            match self.convert_file(&path) {
                Ok(target) => {
                    tracing::info!("Converted {} to {}", path.display(), target.display());
                    report.record_success();
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Error converting file");
                    report.record_failure(FileFailure::new(&path, &e));
                }
            }
        }

        Ok(report)
    }
}
