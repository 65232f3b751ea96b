//! The `interviewer init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("interviewer.toml").exists() {
        println!("interviewer.toml already exists, skipping.");
    } else {
        std::fs::write("interviewer.toml", SAMPLE_CONFIG)?;
        println!("Created interviewer.toml");
    }

    std::fs::create_dir_all("sessions")?;
    let example_path = Path::new("sessions/example.toml");
    if example_path.exists() {
        println!("sessions/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_SESSION)?;
        println!("Created sessions/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit interviewer.toml with your API keys");
    println!("  2. Run: interviewer validate --script sessions/example.toml");
    println!("  3. Try it offline: interviewer run --script sessions/example.toml --offline");
    println!("  4. Run live: interviewer run --script sessions/example.toml --format json,md,html");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# interviewer configuration

default_provider = "anthropic"
default_model = "claude-sonnet-4-20250514"
temperature = 0.2
max_retries = 3
retry_delay_ms = 1000
planning_parallelism = 4
gateway_timeout_secs = 20
output_dir = "./interviewer-results"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

# "hashed" works offline; "openai" or "ollama" use the provider entries above.
[embedding]
provider = "hashed"
"#;

const EXAMPLE_SESSION: &str = r#"[session]
candidate_id = "example-candidate"
name = "Example backend session"
target_role = "Backend engineer"
context = "Five years building HTTP services; some on-call experience."
skills = ["postgres", { name = "rust", level = "senior" }, "kafka"]

# One list per planned main question: the main answer first, then one entry
# per follow-up. The last entry repeats if more follow-ups are asked.

[[answers]]
attempts = [
    "Indexes make reads faster.",
    "A B-tree keeps keys sorted in balanced pages, so lookups take logarithmic time.",
]

[[answers]]
attempts = [
    "I would use a consumer group and commit offsets after processing.",
]

[[answers]]
attempts = [
    "I led the rollback, wrote the postmortem, and added a canary stage.",
]
"#;
