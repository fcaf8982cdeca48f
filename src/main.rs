//! NoteMind - study notes knowledge base client
//!
#![doc = "NoteMind - study notes knowledge base client"]
#![doc = "Main entry point for the NoteMind command-line application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notemind::cli::{Cli, Commands};
use notemind::commands;
use notemind::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments first so --verbose can raise the log level
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Subjects => {
            tracing::info!("Listing subjects");
            commands::subjects::list_subjects(config).await?;
            Ok(())
        }
        Commands::Upload {
            subject,
            handwritten,
            files,
        } => {
            tracing::info!("Starting upload of {} file(s)", files.len());
            if handwritten {
                tracing::debug!("Handwritten mode enabled");
            }
            commands::upload::run_upload(config, subject, handwritten, files).await?;
            Ok(())
        }
        Commands::Ask { subject, question } => {
            tracing::debug!("Asking a single question about '{}'", subject);
            commands::ask::ask_question(config, subject, question).await?;
            Ok(())
        }
        Commands::Chat { subject } => {
            if let Some(s) = &subject {
                tracing::debug!("Using subject override: {}", s);
            }
            commands::chat::run_chat(config, subject).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "notemind=debug" } else { "notemind=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
