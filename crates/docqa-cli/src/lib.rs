//! Terminal interface for docqa

pub mod session;
pub mod ui;


pub use session::{QUESTION_PROMPT, QuestionAnswerer, SessionStats, run_session};
pub use ui::{
    conversion_summary, display_banner, ingest_summary, print_conversion_summary, print_error,
    print_heading, print_ingest_summary, prompt_for_directory,
};

pub use docqa_core::{Error, Result};
