//! The `interviewer validate` command.

use std::path::PathBuf;

use anyhow::Result;

use interviewer_core::parser;

pub fn execute(script_path: PathBuf) -> Result<()> {
    let scripts = if script_path.is_dir() {
        parser::load_session_directory(&script_path)?
    } else {
        vec![parser::parse_session_script(&script_path)?]
    };

    let mut total_warnings = 0;

    for script in &scripts {
        println!(
            "Session: {} (candidate {}, {} skills, {} planned questions)",
            script.name,
            script.candidate_id,
            script.profile.skill_count(),
            script.expected_question_count()
        );

        let warnings = parser::validate_session_script(script);
        for w in &warnings {
            let prefix = w
                .question_index
                .map(|i| format!("  [Q{}]", i + 1))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if scripts.is_empty() {
        println!("No session scripts found.");
    } else if total_warnings == 0 {
        println!("All session scripts valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
