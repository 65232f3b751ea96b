//! The `interviewer show` command.

use std::path::PathBuf;

use anyhow::Result;

use interviewer_core::report::CompletionSummary;
use interviewer_report::{generate_html, generate_markdown};

pub fn execute(summary_path: PathBuf, format: String, output: Option<PathBuf>) -> Result<()> {
    let summary = CompletionSummary::load_json(&summary_path)?;

    let rendered = match format.as_str() {
        "md" | "markdown" => generate_markdown(&summary),
        "html" => generate_html(&summary),
        other => anyhow::bail!("unknown format '{other}' (expected md or html)"),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)?;
            eprintln!("Report written to: {}", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
