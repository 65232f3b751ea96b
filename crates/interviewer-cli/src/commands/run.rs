//! The `interviewer run` command.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use interviewer_core::mock::MockLanguageModel;
use interviewer_core::parser::{self, SessionScript};
use interviewer_core::report::CompletionSummary;
use interviewer_core::service::InterviewService;
use interviewer_core::store::Repositories;
use interviewer_core::traits::{EmbeddingGateway, LanguageModelGateway};
use interviewer_providers::config::{load_config_from, InterviewerConfig};
use interviewer_providers::{create_embedder, create_language_model, HashedEmbedder};
use interviewer_report::{write_html_report, write_markdown_report};

pub struct RunArgs {
    pub script: PathBuf,
    pub offline: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub output: Option<PathBuf>,
    pub format: String,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Markdown,
    Html,
}

fn parse_formats(format: &str) -> Result<Vec<OutputFormat>> {
    let mut formats = Vec::new();
    for fmt in format.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = match fmt {
            "all" => {
                return Ok(vec![
                    OutputFormat::Json,
                    OutputFormat::Markdown,
                    OutputFormat::Html,
                ])
            }
            "json" => OutputFormat::Json,
            "md" | "markdown" => OutputFormat::Markdown,
            "html" => OutputFormat::Html,
            other => anyhow::bail!("unknown format '{other}' (expected json, md, html, all)"),
        };
        if !formats.contains(&parsed) {
            formats.push(parsed);
        }
    }
    anyhow::ensure!(!formats.is_empty(), "at least one output format is required");
    Ok(formats)
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let formats = parse_formats(&args.format)?;
    let config = load_config_from(args.config.as_deref())?;

    let scripts = if args.script.is_dir() {
        parser::load_session_directory(&args.script)?
    } else {
        vec![parser::parse_session_script(&args.script)?]
    };
    anyhow::ensure!(
        !scripts.is_empty(),
        "no session scripts found in {}",
        args.script.display()
    );

    let (llm, embedder) = build_gateways(&config, &args)?;
    let output = args.output.clone().unwrap_or_else(|| config.output_dir.clone());

    eprintln!(
        "interviewer v{}: {} session(s), language model: {}, embeddings: {}",
        env!("CARGO_PKG_VERSION"),
        scripts.len(),
        if args.offline { "offline" } else { "live" },
        embedder.name(),
    );

    for script in &scripts {
        for w in parser::validate_session_script(script) {
            eprintln!("  [{}] WARNING: {}", script.name, w.message);
        }

        let (store, repos) = Repositories::in_memory();
        let service = InterviewService::new(
            Arc::clone(&llm),
            Arc::clone(&embedder),
            repos,
            config.service_config(),
        );

        let summary = run_session(&service, script).await?;
        print_summary(&summary);

        std::fs::create_dir_all(&output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        let stem = file_stem(script, &summary);

        let snapshot_path = output.join(format!("{stem}-session.json"));
        store.save_snapshot(&snapshot_path).await?;
        eprintln!("Session snapshot: {}", snapshot_path.display());

        for fmt in &formats {
            match fmt {
                OutputFormat::Json => {
                    let path = output.join(format!("{stem}.json"));
                    summary.save_json(&path)?;
                    eprintln!("Summary saved to: {}", path.display());
                }
                OutputFormat::Markdown => {
                    let path = output.join(format!("{stem}.md"));
                    write_markdown_report(&summary, &path)?;
                    eprintln!("Markdown report: {}", path.display());
                }
                OutputFormat::Html => {
                    let path = output.join(format!("{stem}.html"));
                    write_html_report(&summary, &path)?;
                    eprintln!("HTML report: {}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn build_gateways(
    config: &InterviewerConfig,
    args: &RunArgs,
) -> Result<(Arc<dyn LanguageModelGateway>, Arc<dyn EmbeddingGateway>)> {
    if args.offline {
        return Ok((
            Arc::new(MockLanguageModel::new()),
            Arc::new(HashedEmbedder::new(config.embedding.dimension)),
        ));
    }
    let llm = create_language_model(config, args.provider.as_deref(), args.model.as_deref())?;
    let embedder = create_embedder(config)?;
    Ok((llm, embedder))
}

/// Plan, start, answer every deliverable from the script, complete.
async fn run_session(service: &InterviewService, script: &SessionScript) -> Result<CompletionSummary> {
    eprintln!(
        "\nSession '{}' for {} ({} skills)",
        script.name,
        script.candidate_id,
        script.profile.skill_count()
    );

    let interview = service
        .plan(&script.candidate_id, &script.profile)
        .await
        .with_context(|| format!("planning failed for session '{}'", script.name))?;
    eprintln!("  Planned {} questions", interview.question_ids.len());
    service.start(interview.id).await?;

    let positions: HashMap<Uuid, usize> = interview
        .question_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    let mut attempts: HashMap<Uuid, usize> = HashMap::new();

    while let Some(deliverable) = service.get_next_deliverable(interview.id).await? {
        let parent = deliverable.parent_question_id();
        let index = positions.get(&parent).copied().unwrap_or_default();
        let attempt = attempts.entry(parent).or_default();

        let Some(text) = script.response(index, *attempt) else {
            eprintln!("  Q{}: no scripted answer, ending session early", index + 1);
            break;
        };

        let label = if deliverable.is_follow_up() {
            format!("Q{}.{}", index + 1, *attempt)
        } else {
            format!("Q{}", index + 1)
        };
        eprintln!("  {label}: {}", deliverable.text());

        let result = service
            .evaluate(interview.id, deliverable.id(), text)
            .await
            .with_context(|| format!("evaluation of {label} failed"))?;
        *attempt += 1;

        let similarity = result
            .answer
            .similarity_score
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".into());
        eprintln!(
            "    score {:.0}, similarity {similarity}, {:?}",
            result.answer.evaluation.score, result.phase
        );
    }

    let summary = service.complete(interview.id).await?;
    tracing::info!(
        interview_id = %interview.id,
        aggregate = summary.aggregate_score,
        "session '{}' completed",
        script.name
    );
    Ok(summary)
}

fn file_stem(script: &SessionScript, summary: &CompletionSummary) -> String {
    let safe: String = script
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let timestamp = summary.created_at.format("%Y-%m-%dT%H%M%S");
    format!("{safe}-{timestamp}")
}

fn print_summary(summary: &CompletionSummary) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "#",
        "Question",
        "Type",
        "Difficulty",
        "Scores",
        "Follow-ups",
        "Gaps filled",
    ]);

    for (i, q) in summary.questions.iter().enumerate() {
        let scores = if q.score_progression.is_empty() {
            "unanswered".to_string()
        } else {
            q.score_progression
                .iter()
                .map(|s| format!("{s:.0}"))
                .collect::<Vec<_>>()
                .join(" → ")
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(truncate(&q.question_text, 60)),
            Cell::new(q.question_type),
            Cell::new(q.difficulty),
            Cell::new(scores),
            Cell::new(q.follow_up_count),
            Cell::new(format!("{}/{}", q.gap_filled_count, q.first_attempt_gaps.len())),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!(
        "Aggregate {:.1} (theoretical {:.1}, speaking {:.1})\n",
        summary.aggregate_score, summary.theoretical_avg, summary.speaking_avg
    );
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars - 1).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!(parse_formats("json").unwrap(), vec![OutputFormat::Json]);
        assert_eq!(
            parse_formats("md, html,md").unwrap(),
            vec![OutputFormat::Markdown, OutputFormat::Html]
        );
        assert_eq!(parse_formats("all").unwrap().len(), 3);
        assert!(parse_formats("pdf").is_err());
        assert!(parse_formats("").is_err());
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
