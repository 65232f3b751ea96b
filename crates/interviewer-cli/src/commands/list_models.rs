//! The `interviewer list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use interviewer_providers::config::load_config_from;
use interviewer_providers::ollama::OllamaProvider;
use interviewer_providers::{create_provider, ProviderConfig};

pub async fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();

    let mut found_any = false;

    for name in names {
        if provider_filter.as_ref().is_some_and(|f| f != name) {
            continue;
        }
        let provider_config = &config.providers[name];

        let models = match provider_config {
            // Installed models are only known by asking the server.
            ProviderConfig::Ollama { base_url } => {
                match OllamaProvider::new(base_url).list_models_async().await {
                    Ok(models) => models,
                    Err(e) => {
                        eprintln!("Provider {name}: {e:#}");
                        continue;
                    }
                }
            }
            _ => create_provider(name, provider_config)?.available_models(),
        };

        if !models.is_empty() {
            found_any = true;
            println!("Provider: {name}");
            for model in &models {
                if model.max_context > 0 {
                    println!(
                        "  {} - {} ({}K context, ${:.4}/{:.4} per 1K tokens)",
                        model.id,
                        model.name,
                        model.max_context / 1000,
                        model.cost_per_1k_input,
                        model.cost_per_1k_output,
                    );
                } else {
                    println!("  {} (local)", model.id);
                }
            }
            println!();
        }
    }

    if !found_any {
        println!("No providers configured. Run `interviewer init` to create a config file.");
    }

    Ok(())
}
