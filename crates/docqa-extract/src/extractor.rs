//! Extension-dispatched text extraction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::ExtractionError;

/// File types the extractors understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Docx,
    Pdf,
    Txt,
}

impl FileKind {
    /// Resolve the kind from a path's extension, ignoring case
    pub fn from_path(path: &Path) -> Option<FileKind> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        Self::from_extension(&extension)
    }

    pub fn from_extension(extension: &str) -> Option<FileKind> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "docx" => Some(FileKind::Docx),
            "pdf" => Some(FileKind::Pdf),
            "txt" => Some(FileKind::Txt),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Docx => "docx",
            FileKind::Pdf => "pdf",
            FileKind::Txt => "txt",
        }
    }

    /// Whether the batch converter turns this kind into a `.txt`
    pub fn is_convertible(&self) -> bool {
        matches!(self, FileKind::Docx | FileKind::Pdf)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Character encoding a text file was finally read with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Text pulled out of a file, kept as paragraphs (docx) or pages (pdf)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub kind: FileKind,
    pub segments: Vec<String>,
    pub encoding: TextEncoding,
}

impl ExtractedText {
    fn new(kind: FileKind, segments: Vec<String>) -> Self {
        Self {
            kind,
            segments,
            encoding: TextEncoding::Utf8,
        }
    }

    /// Single-line form used for embedding and retrieval
    pub fn corpus_text(&self) -> String {
        self.segments
            .iter()
            .filter(|segment| !segment.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Line-oriented form written by the batch converter
    pub fn plain_text(&self) -> String {
        match self.kind {
            FileKind::Docx => self
                .segments
                .iter()
                .filter(|p| !p.trim().is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
            FileKind::Pdf | FileKind::Txt => self.segments.join("\n"),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(|s| s.trim().is_empty())
    }
}

/// Reads `.docx`, `.pdf` and `.txt` files into text
///
/// Failures come back as a tagged [`ExtractionError`] and are logged with
/// the offending path; nothing here panics or aborts the caller's batch.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    latin1_fallback: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            latin1_fallback: true,
        }
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor that fails `.txt` files that are not valid UTF-8
    pub fn strict() -> Self {
        Self {
            latin1_fallback: false,
        }
    }

    /// Extract text from a file, dispatching on its extension
    pub fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractionError> {
        let result = self.try_extract(path);
        match &result {
            Ok(text) if text.encoding == TextEncoding::Latin1 => {
                tracing::warn!(
                    path = %path.display(),
                    "decoded with latin-1 due to UTF-8 failure"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    reason = e.tag(),
                    error = %e,
                    "Error processing file"
                );
            }
        }
        result
    }

    fn try_extract(&self, path: &Path) -> Result<ExtractedText, ExtractionError> {
        let kind = FileKind::from_path(path).ok_or_else(|| {
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "(none)".to_string());
            ExtractionError::UnsupportedType(extension)
        })?;

        let data = std::fs::read(path)?;
        let text = self.extract_bytes(kind, &data)?;
        if text.is_blank() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }

    /// Extract text from in-memory file contents of a known kind
    pub fn extract_bytes(
        &self,
        kind: FileKind,
        data: &[u8],
    ) -> Result<ExtractedText, ExtractionError> {
        match kind {
            FileKind::Docx => extract_docx(data),
            FileKind::Pdf => extract_pdf(data),
            FileKind::Txt => self.extract_txt(data),
        }
    }

    fn extract_txt(&self, data: &[u8]) -> Result<ExtractedText, ExtractionError> {
        match std::str::from_utf8(data) {
            Ok(text) => Ok(ExtractedText::new(FileKind::Txt, vec![text.to_string()])),
            Err(e) if self.latin1_fallback => {
                tracing::debug!(error = %e, "UTF-8 decode failed, retrying as latin-1");
                let mut text = ExtractedText::new(FileKind::Txt, vec![decode_latin1(data)]);
                text.encoding = TextEncoding::Latin1;
                Ok(text)
            }
            Err(e) => Err(ExtractionError::Decode(e.to_string())),
        }
    }
}

/// ISO-8859-1: every byte is the code point of the same value
fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| char::from(b)).collect()
}

fn extract_docx(data: &[u8]) -> Result<ExtractedText, ExtractionError> {
    let doc = docx_rs::read_docx(data)
        .map_err(|e| ExtractionError::parser(FileKind::Docx, e.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in &doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            let mut paragraph = String::new();
            for child in &p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in &run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            paragraph.push_str(&t.text);
                        }
                    }
                }
            }
            paragraphs.push(paragraph);
        }
    }

    Ok(ExtractedText::new(FileKind::Docx, paragraphs))
}

fn extract_pdf(data: &[u8]) -> Result<ExtractedText, ExtractionError> {
    // pdf-extract panics on some malformed inputs
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(data)
    }));

    match outcome {
        Ok(Ok(pages)) => Ok(ExtractedText::new(FileKind::Pdf, pages)),
        Ok(Err(e)) => Err(ExtractionError::parser(FileKind::Pdf, e.to_string())),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "parser panicked".to_string());
            Err(ExtractionError::parser(FileKind::Pdf, message))
        }
    }
}
