//! TOML session script parser.
//!
//! A session script describes one candidate, their skill profile, and the
//! answers to give to each planned main question (first the main answer, then
//! one entry per follow-up). When a question's list runs out the last answer is
//! repeated.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Skill, SkillProfile};
use crate::planner::calculate_question_count;

/// Intermediate TOML structure for parsing session files.
#[derive(Debug, Deserialize)]
struct TomlSessionFile {
    session: TomlSessionHeader,
    #[serde(default)]
    answers: Vec<TomlAnswers>,
}

#[derive(Debug, Deserialize)]
struct TomlSessionHeader {
    candidate_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    target_role: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    skills: Vec<TomlSkill>,
}

/// Skills may be given as bare strings or as `{ name, level }` tables.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TomlSkill {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        level: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct TomlAnswers {
    #[serde(default)]
    attempts: Vec<String>,
}

/// A scripted interview session.
#[derive(Debug, Clone)]
pub struct SessionScript {
    /// Display name; defaults to the file stem.
    pub name: String,
    pub candidate_id: String,
    pub profile: SkillProfile,
    /// Answer attempts per main question, in plan order.
    pub responses: Vec<Vec<String>>,
}

impl SessionScript {
    /// Scripted answer for attempt `attempt` (0 = main answer) of question `question_index`.
    ///
    /// `None` when the script has no answers for that question.
    pub fn response(&self, question_index: usize, attempt: usize) -> Option<&str> {
        let attempts = self.responses.get(question_index)?;
        attempts
            .get(attempt)
            .or_else(|| attempts.last())
            .map(String::as_str)
    }

    /// Number of main questions the planner will produce for this profile.
    pub fn expected_question_count(&self) -> usize {
        calculate_question_count(self.profile.skill_count())
    }
}

/// Parse a single TOML file into a `SessionScript`.
pub fn parse_session_script(path: &Path) -> Result<SessionScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session script: {}", path.display()))?;

    parse_session_script_str(&content, path)
}

/// Parse a TOML string into a `SessionScript`.
pub fn parse_session_script_str(content: &str, source_path: &Path) -> Result<SessionScript> {
    let parsed: TomlSessionFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let candidate_id = parsed.session.candidate_id.trim().to_string();
    anyhow::ensure!(
        !candidate_id.is_empty(),
        "{}: session.candidate_id is empty",
        source_path.display()
    );

    let skills = parsed
        .session
        .skills
        .into_iter()
        .map(|s| match s {
            TomlSkill::Name(name) => Skill::new(name),
            TomlSkill::Detailed { name, level } => Skill { name, level },
        })
        .filter(|s| !s.name.trim().is_empty())
        .collect();

    let name = parsed.session.name.unwrap_or_else(|| {
        source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| candidate_id.clone())
    });

    Ok(SessionScript {
        name,
        candidate_id,
        profile: SkillProfile {
            skills,
            target_role: parsed.session.target_role,
            context: parsed.session.context,
        },
        responses: parsed.answers.into_iter().map(|a| a.attempts).collect(),
    })
}

/// Recursively load all `.toml` session scripts from a directory.
pub fn load_session_directory(dir: &Path) -> Result<Vec<SessionScript>> {
    let mut scripts = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            scripts.extend(load_session_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_session_script(&path) {
                Ok(script) => scripts.push(script),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    scripts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(scripts)
}

/// A warning from session script validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// 0-based main question index (if applicable).
    pub question_index: Option<usize>,
    pub message: String,
}

/// Validate a session script for common issues.
pub fn validate_session_script(script: &SessionScript) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if script.profile.skills.is_empty() {
        warnings.push(ValidationWarning {
            question_index: None,
            message: "no skills listed; questions will target the role or general engineering"
                .into(),
        });
    }

    let expected = script.expected_question_count();
    if script.responses.len() < expected {
        warnings.push(ValidationWarning {
            question_index: None,
            message: format!(
                "{} answer lists for {expected} planned questions; the rest stay unanswered",
                script.responses.len()
            ),
        });
    } else if script.responses.len() > expected {
        warnings.push(ValidationWarning {
            question_index: None,
            message: format!(
                "{} answer lists for {expected} planned questions; extras are ignored",
                script.responses.len()
            ),
        });
    }

    for (index, attempts) in script.responses.iter().enumerate() {
        if attempts.is_empty() {
            warnings.push(ValidationWarning {
                question_index: Some(index),
                message: "no attempts listed".into(),
            });
        }
        for (attempt, text) in attempts.iter().enumerate() {
            if text.trim().is_empty() {
                warnings.push(ValidationWarning {
                    question_index: Some(index),
                    message: format!("attempt {} is empty", attempt + 1),
                });
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[session]
candidate_id = "cand-042"
name = "Backend screen"
target_role = "Backend Engineer"
skills = ["rust", { name = "postgres", level = "senior" }]

[[answers]]
attempts = [
    "Ownership means every value has one owner.",
    "Borrowing lends references without moving.",
]

[[answers]]
attempts = ["Indexes speed up reads at the cost of writes."]
"#;

    #[test]
    fn parse_valid_toml() {
        let script = parse_session_script_str(VALID_TOML, &PathBuf::from("s.toml")).unwrap();
        assert_eq!(script.candidate_id, "cand-042");
        assert_eq!(script.name, "Backend screen");
        assert_eq!(script.profile.skills.len(), 2);
        assert_eq!(script.profile.skills[1].level.as_deref(), Some("senior"));
        assert_eq!(script.profile.target_role.as_deref(), Some("Backend Engineer"));
        assert_eq!(script.responses.len(), 2);
        assert_eq!(script.expected_question_count(), 2);
    }

    #[test]
    fn response_repeats_last_attempt() {
        let script = parse_session_script_str(VALID_TOML, &PathBuf::from("s.toml")).unwrap();
        assert!(script.response(0, 0).unwrap().starts_with("Ownership"));
        assert!(script.response(0, 1).unwrap().starts_with("Borrowing"));
        assert!(script.response(0, 5).unwrap().starts_with("Borrowing"));
        assert!(script.response(1, 3).unwrap().starts_with("Indexes"));
        assert_eq!(script.response(2, 0), None);
    }

    #[test]
    fn name_defaults_to_file_stem() {
        let toml = r#"
[session]
candidate_id = "c1"
"#;
        let script = parse_session_script_str(toml, &PathBuf::from("dir/junior.toml")).unwrap();
        assert_eq!(script.name, "junior");
        assert!(script.profile.skills.is_empty());
    }

    #[test]
    fn empty_candidate_id_is_an_error() {
        let toml = r#"
[session]
candidate_id = "  "
"#;
        let err = parse_session_script_str(toml, &PathBuf::from("s.toml")).unwrap_err();
        assert!(err.to_string().contains("candidate_id is empty"));
    }

    #[test]
    fn validate_reports_missing_and_empty_answers() {
        let toml = r#"
[session]
candidate_id = "c1"

[[answers]]
attempts = ["fine", "  "]

[[answers]]
attempts = []
"#;
        let script = parse_session_script_str(toml, &PathBuf::from("s.toml")).unwrap();
        let warnings = validate_session_script(&script);
        assert!(warnings.iter().any(|w| w.message.contains("no skills")));
        assert!(warnings
            .iter()
            .any(|w| w.question_index == Some(0) && w.message.contains("attempt 2 is empty")));
        assert!(warnings
            .iter()
            .any(|w| w.question_index == Some(1) && w.message.contains("no attempts")));
    }

    #[test]
    fn validate_counts_answer_lists_against_plan() {
        let toml = r#"
[session]
candidate_id = "c1"
skills = ["a", "b", "c", "d", "e", "f"]

[[answers]]
attempts = ["one"]
"#;
        let script = parse_session_script_str(toml, &PathBuf::from("s.toml")).unwrap();
        let warnings = validate_session_script(&script);
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("1 answer lists for 4 planned questions")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_session_script_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "nope = [").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let scripts = load_session_directory(dir.path()).unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].candidate_id, "cand-042");
    }
}
