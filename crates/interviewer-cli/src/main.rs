//! interviewer CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "interviewer", version, about = "Adaptive technical interview engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scripted interview sessions end to end
    Run {
        /// Path to a .toml session script or a directory of scripts
        #[arg(long)]
        script: PathBuf,

        /// Use the built-in fixed-output language model and hashed embeddings
        #[arg(long)]
        offline: bool,

        /// Provider name from the config (defaults to `default_provider`)
        #[arg(long)]
        provider: Option<String>,

        /// Model id (defaults to `default_model`)
        #[arg(long)]
        model: Option<String>,

        /// Output directory (defaults to `output_dir` from the config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output formats: json, md, html, all (comma-separated)
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate session script TOML files
    Validate {
        /// Path to a session script or directory
        #[arg(long)]
        script: PathBuf,
    },

    /// Render a saved completion summary
    Show {
        /// Summary JSON written by `run`
        #[arg(long)]
        summary: PathBuf,

        /// Output format: md or html
        #[arg(long, default_value = "md")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example session script
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("interviewer=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            script,
            offline,
            provider,
            model,
            output,
            format,
            config,
        } => {
            commands::run::execute(commands::run::RunArgs {
                script,
                offline,
                provider,
                model,
                output,
                format,
                config,
            })
            .await
        }
        Commands::Validate { script } => commands::validate::execute(script),
        Commands::Show {
            summary,
            format,
            output,
        } => commands::show::execute(summary, format, output),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
