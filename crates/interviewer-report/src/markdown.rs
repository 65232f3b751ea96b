//! Markdown report generator.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use interviewer_core::report::CompletionSummary;

/// Escape `|` so free text does not break table rows.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// Generate a Markdown report from a completion summary.
pub fn generate_markdown(summary: &CompletionSummary) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# Interview report: {}\n", summary.candidate_id);
    let _ = writeln!(
        md,
        "_{} questions, {} follow-ups, {}_\n",
        summary.questions.len(),
        summary.total_follow_ups,
        summary.created_at.format("%Y-%m-%d %H:%M UTC")
    );

    md.push_str("## Scores\n\n");
    md.push_str("| Aggregate | Theoretical | Speaking |\n|---|---|---|\n");
    let _ = writeln!(
        md,
        "| {:.1} | {:.1} | {:.1} |\n",
        summary.aggregate_score, summary.theoretical_avg, summary.speaking_avg
    );

    md.push_str("## Questions\n\n");
    md.push_str("| # | Question | Type | Difficulty | Progression | Follow-ups | Gaps filled | Still missing |\n");
    md.push_str("|---|---|---|---|---|---|---|---|\n");
    for (i, q) in summary.questions.iter().enumerate() {
        let progression = if q.score_progression.is_empty() {
            "unanswered".to_string()
        } else {
            q.score_progression
                .iter()
                .map(|s| format!("{s:.0}"))
                .collect::<Vec<_>>()
                .join(" → ")
        };
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | {}/{} | {} |",
            i + 1,
            cell(&q.question_text),
            q.question_type,
            q.difficulty,
            progression,
            q.follow_up_count,
            q.gap_filled_count,
            q.first_attempt_gaps.len(),
            cell(&q.last_attempt_gaps.join(", ")),
        );
    }
    md.push('\n');

    let recs = &summary.recommendations;
    let sections = [
        ("Strengths", &recs.strengths),
        ("Weaknesses", &recs.weaknesses),
        ("Study topics", &recs.study_topics),
        ("Technique tips", &recs.technique_tips),
    ];
    if sections.iter().any(|(_, items)| !items.is_empty()) {
        md.push_str("## Recommendations\n\n");
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(md, "### {title}\n");
            for item in items {
                let _ = writeln!(md, "- {item}");
            }
            md.push('\n');
        }
    }

    let weak = summary.weakest_questions(50.0);
    if !weak.is_empty() {
        md.push_str("## Needs work\n\n");
        for q in weak {
            let _ = writeln!(
                md,
                "- {} (final score {:.0})",
                q.question_text,
                q.final_score().unwrap_or(0.0)
            );
        }
        md.push('\n');
    }

    md
}

/// Write a Markdown report to a file.
pub fn write_markdown_report(summary: &CompletionSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_markdown(summary))
        .with_context(|| format!("failed to write Markdown report to {}", path.display()))?;
    Ok(())
}
