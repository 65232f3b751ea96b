//! interviewer-report: human-readable renderings of a completed interview.
//!
//! The JSON form lives on `CompletionSummary` itself; this crate adds
//! Markdown and self-contained HTML.

pub mod html;
pub mod markdown;

pub use html::{generate_html, write_html_report};
pub use markdown::{generate_markdown, write_markdown_report};
