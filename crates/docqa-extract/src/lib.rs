//! Text extraction for docqa
//!
//! Turns `.docx`, `.pdf` and `.txt` files into text, and converts whole
//! folders of `.docx`/`.pdf` files into `.txt` files.

mod converter;
mod error;
mod extractor;
pub mod listing;


pub use converter::Converter;
pub use error::ExtractionError;
pub use extractor::{ExtractedText, Extractor, FileKind, TextEncoding};
pub use listing::{ensure_directory, list_files};
