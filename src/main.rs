use clap::Parser;
use image_batch_pipeline::{
    app_state::AppState,
    cli::{Cli, Commands},
    commands,
    config::AppConfig,
    services::recovery::{recover_orphaned_download, RecoveryOutcome},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = AppConfig::from_env()?;

    // Initialize structured logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let state = AppState::new(config)?;

    // A marker left behind means the last download was interrupted
    match recover_orphaned_download(state.recovery.as_ref())? {
        RecoveryOutcome::Clean => {}
        RecoveryOutcome::RemovedOrphan(path) | RecoveryOutcome::StaleMarker(path) => {
            tracing::info!(path = %path.display(), "Recovered from interrupted download");
        }
    }

    match cli.command {
        Commands::Submit(args) => commands::submit::run(&state, args).await?,
        Commands::Status(args) => commands::status::run(&state, args).await?,
        Commands::Download(args) => commands::download::run(&state, args).await?,
        Commands::Storage => commands::storage::run(&state).await?,
        Commands::Cleanup(args) => commands::cleanup::run(&state, args).await?,
    }

    Ok(())
}
