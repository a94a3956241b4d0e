//! Common types used across the docqa system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file plus the text extracted from it
///
/// Lives only between extraction and embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Display form of the source path, as stored alongside the vector
    pub fn source(&self) -> String {
        self.path.display().to_string()
    }
}

/// A stored vector and the text it was computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub vector: Vec<f32>,
    pub text: String,
    pub source: Option<String>,
}

impl EmbeddingRecord {
    pub fn new(vector: Vec<f32>, text: impl Into<String>) -> Self {
        Self {
            vector,
            text: text.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn from_document(document: Document, vector: Vec<f32>) -> Self {
        let source = document.source();
        Self {
            vector,
            text: document.text,
            source: Some(source),
        }
    }
}

/// A record returned by nearest-neighbour search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub source: Option<String>,
    /// Squared L2 distance to the query vector
    pub distance: f32,
}

/// A file that was skipped, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: &Path, reason: impl ToString) -> Self {
        Self {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a batch `.docx`/`.pdf` to `.txt` conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub converted: usize,
    pub failed: usize,
    pub failures: Vec<FileFailure>,
}

impl ConversionReport {
    pub fn record_success(&mut self) {
        self.converted += 1;
    }

    pub fn record_failure(&mut self, failure: FileFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }
}

/// Outcome of loading a document folder into the vector table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FileFailure>,
}

impl IngestReport {
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, failure: FileFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}
