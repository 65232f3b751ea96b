//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use interviewer_core::report::{CompletionSummary, QuestionOutcome};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn score_class(score: f64) -> &'static str {
    if score >= 70.0 {
        "pass"
    } else if score >= 40.0 {
        "warn"
    } else {
        "fail"
    }
}

/// Generate an HTML report from a completion summary.
pub fn generate_html(summary: &CompletionSummary) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Interview report: {}</title>\n",
        html_escape(&summary.candidate_id)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>Interview report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Candidate: <strong>{}</strong> | {} questions | {} follow-ups | {}</p>\n",
        html_escape(&summary.candidate_id),
        summary.questions.len(),
        summary.total_follow_ups,
        summary.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Scores
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Scores</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Aggregate</th><th>Theoretical</th><th>Speaking</th></tr></thead>\n");
    html.push_str(&format!(
        "<tbody><tr><td class=\"{}\">{:.1}</td><td>{:.1}</td><td>{:.1}</td></tr></tbody></table>\n",
        score_class(summary.aggregate_score),
        summary.aggregate_score,
        summary.theoretical_avg,
        summary.speaking_avg,
    ));
    if summary.questions.iter().any(QuestionOutcome::is_answered) {
        html.push_str(&generate_bar_chart(&summary.questions));
    }
    html.push_str("</section>\n");

    // Per-question progression
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Questions</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Question</th><th onclick=\"sortTable(2)\">Type</th><th onclick=\"sortTable(3)\">Difficulty</th><th onclick=\"sortTable(4)\">Progression</th><th onclick=\"sortTable(5)\">Follow-ups</th><th onclick=\"sortTable(6)\">Gaps filled</th><th>Still missing</th></tr></thead>\n");
    html.push_str("<tbody>\n");

    for (i, q) in summary.questions.iter().enumerate() {
        let row_class = q.final_score().map(score_class).unwrap_or("unanswered");
        let progression = if q.score_progression.is_empty() {
            "-".to_string()
        } else {
            q.score_progression
                .iter()
                .map(|s| format!("{s:.0}"))
                .collect::<Vec<_>>()
                .join(" &rarr; ")
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}/{}</td><td>{}</td></tr>\n",
            row_class,
            i + 1,
            html_escape(&q.question_text),
            q.question_type,
            q.difficulty,
            progression,
            q.follow_up_count,
            q.gap_filled_count,
            q.first_attempt_gaps.len(),
            html_escape(&q.last_attempt_gaps.join(", ")),
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Attempts
    html.push_str("<section class=\"attempts\">\n");
    html.push_str("<h2>Attempts</h2>\n");
    for (i, q) in summary.questions.iter().enumerate() {
        if !q.is_answered() {
            continue;
        }
        html.push_str(&format!(
            "<details>\n<summary>Q{}: {}</summary>\n<ol>\n",
            i + 1,
            html_escape(&q.question_text)
        ));
        for attempt in &q.attempts {
            let similarity = attempt
                .similarity_score
                .map(|s| format!("{s:.2}"))
                .unwrap_or_else(|| "-".to_string());
            html.push_str(&format!(
                "<li><p class=\"prompt\">{}</p><blockquote>{}</blockquote><p class=\"meta\">score {:.0} | similarity {}{}</p></li>\n",
                html_escape(&attempt.prompt),
                html_escape(&attempt.answer_text),
                attempt.score,
                similarity,
                if attempt.missing_concepts.is_empty() {
                    String::new()
                } else {
                    format!(" | missing: {}", html_escape(&attempt.missing_concepts.join(", ")))
                },
            ));
        }
        html.push_str("</ol>\n</details>\n");
    }
    html.push_str("</section>\n");

    // Recommendations
    let recs = &summary.recommendations;
    html.push_str("<section class=\"recommendations\">\n");
    html.push_str("<h2>Recommendations</h2>\n");
    for (title, items) in [
        ("Strengths", &recs.strengths),
        ("Weaknesses", &recs.weaknesses),
        ("Study topics", &recs.study_topics),
        ("Technique tips", &recs.technique_tips),
    ] {
        if items.is_empty() {
            continue;
        }
        html.push_str(&format!("<h3>{title}</h3>\n<ul>\n"));
        for item in items {
            html.push_str(&format!("<li>{}</li>\n", html_escape(item)));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(summary).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(summary: &CompletionSummary, path: &Path) -> Result<()> {
    let html = generate_html(summary);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

/// Horizontal bars of each question's final score.
fn generate_bar_chart(questions: &[QuestionOutcome]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 80;

    let total_height = questions.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, q) in questions.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let score = q.final_score().unwrap_or(0.0).clamp(0.0, 100.0);
        let width = (score / 100.0 * max_width as f64) as usize;

        let color = if score >= 70.0 {
            "#22c55e"
        } else if score >= 40.0 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">Q{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            i + 1
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        let label = match q.final_score() {
            Some(s) => format!("{s:.0}"),
            None => "unanswered".to_string(),
        };
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            label
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --warn: #fef9c3; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --warn: #713f12; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.warn { background: var(--warn); }
.fail { background: var(--fail); }
.unanswered { opacity: 0.6; }
.prompt { font-weight: bold; }
blockquote { border-left: 3px solid var(--border); margin: 0.5rem 0; padding-left: 1rem; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, {numeric: true}) : vb.localeCompare(va, undefined, {numeric: true});
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
