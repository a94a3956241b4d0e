//! Extraction failure reasons

use thiserror::Error;

use crate::FileKind;

/// Why a file produced no text
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("could not decode text: {0}")]
    Decode(String),

    #[error("{kind} parser failed: {message}")]
    Parser { kind: FileKind, message: String },

    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("no text found")]
    Empty,
}

impl ExtractionError {
    pub fn parser(kind: FileKind, message: impl Into<String>) -> Self {
        Self::Parser {
            kind,
            message: message.into(),
        }
    }

    /// Short machine-readable tag for the failure reason
    pub fn tag(&self) -> &'static str {
        match self {
            ExtractionError::UnsupportedType(_) => "unsupported_type",
            ExtractionError::Decode(_) => "decode_error",
            ExtractionError::Parser { .. } => "parser_error",
            ExtractionError::Io(_) => "io_error",
            ExtractionError::Empty => "empty",
        }
    }
}

impl From<ExtractionError> for docqa_core::Error {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Io(e) => docqa_core::Error::Io(e),
            other => docqa_core::Error::Extraction(other.to_string()),
        }
    }
}
