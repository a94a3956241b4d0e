//! UI utilities for the CLI

use colored::*;
use crossterm::terminal::size;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use docqa_core::{ConversionReport, Error, FileFailure, IngestReport, Result};

pub const DIRECTORY_PROMPT: &str =
    "Enter the directory path where your .docx, .pdf or .txt files are located: ";

/// Display startup banner
pub fn display_banner(subtitle: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = terminal_width.saturating_sub(4).clamp(40, 67);
    let inner = banner_width - 2;

    let pad = |text: &str| {
        let used = text.chars().count() + 2;
        format!("│  {}{}│", text, " ".repeat(inner.saturating_sub(used)))
    };

    println!();
    println!("{}", format!("┌{}┐", "─".repeat(inner)).blue());
    println!("{}", pad("docqa - ask questions about your documents").blue().bold());
    println!("{}", pad(subtitle).blue());
    println!("{}", format!("└{}┘", "─".repeat(inner)).blue());
    println!();
}

/// Ask for the document directory on `output`, read it from `input`
pub fn prompt_for_directory<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<PathBuf> {
    write!(output, "{}", DIRECTORY_PROMPT)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(Error::Configuration("No directory given".to_string()));
    }
    Ok(PathBuf::from(trimmed))
}

/// Three-line batch conversion summary
pub fn conversion_summary(report: &ConversionReport) -> String {
    format!(
        "Batch Conversion Summary:\nSuccessfully converted: {} files\nFailed to convert: {} files",
        report.converted, report.failed
    )
}

/// Three-line ingestion summary
pub fn ingest_summary(report: &IngestReport) -> String {
    format!(
        "Processing Summary:\nSuccessful documents: {}\nFailed documents: {}",
        report.succeeded, report.failed
    )
}

pub fn print_conversion_summary(report: &ConversionReport) {
    println!();
    println!("{}", conversion_summary(report));
    print_failures(&report.failures);
}

pub fn print_ingest_summary(report: &IngestReport) {
    println!();
    println!("{}", ingest_summary(report));
    print_failures(&report.failures);
}

fn print_failures(failures: &[FileFailure]) {
    for failure in failures {
        println!("  {} {}: {}", "✗".red(), failure.path, failure.reason.dimmed());
    }
}

/// Section heading before model output
pub fn print_heading(text: &str) {
    println!();
    println!("{}", text.bold());
}

pub fn print_error(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;

    #[test]
    fn test_prompt_for_directory_trims_input() {
        let mut out = Vec::new();
        let dir = prompt_for_directory(Cursor::new("  ./docs \n"), &mut out).unwrap();
        assert_eq!(dir, PathBuf::from("./docs"));
        assert_eq!(String::from_utf8(out).unwrap(), DIRECTORY_PROMPT);
    }

    #[test]
    fn test_prompt_for_directory_rejects_empty() {
        let err = prompt_for_directory(Cursor::new("\n"), Vec::new()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_ingest_summary_counts_failures() {
        let mut report = IngestReport::default();
        report.record_success();
        report.record_failure(FileFailure::new(Path::new("a.xlsx"), "unsupported"));
        report.record_failure(FileFailure::new(Path::new("b.txt"), "empty"));
        assert_eq!(
            ingest_summary(&report),
            "Processing Summary:\nSuccessful documents: 1\nFailed documents: 2"
        );
    }
}
