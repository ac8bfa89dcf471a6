use std::sync::Arc;

use clap::{Parser, Subcommand};
use fuel_log_indexer::{
    cmd::{DryRunArgs, dry_run},
    config::AppConfig,
    http_client::{create_base_http_client, create_retryable_http_client},
    persistence::sqlite::SqliteRecordStore,
    providers::portal::PortalBlockSource,
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `app.yaml`.
    #[arg(long, global = true, default_value = "configs")]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the extraction pipeline until interrupted.
    Run,
    /// Extracts records over a block range and prints them without storing
    /// anything.
    DryRun(DryRunArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    tracing::debug!(config_dir = %cli.config_dir, "Loading application configuration...");
    let config = AppConfig::new(Some(&cli.config_dir))?;

    match cli.command {
        Commands::Run => run_supervisor(config).await?,
        Commands::DryRun(args) => dry_run::execute(config, args).await?,
    }

    Ok(())
}

async fn run_supervisor(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(
        database_url = %config.database_url,
        portal_url = %config.portal.url,
        pipeline_id = %config.pipeline_id,
        "Configuration loaded."
    );

    tracing::debug!("Initializing record store...");
    let store = Arc::new(SqliteRecordStore::new(&config.database_url).await?);
    store.run_migrations().await?;
    tracing::info!("Database migrations completed.");

    tracing::debug!(portal_url = %config.portal.url, "Initializing portal block source...");
    let base_client = create_base_http_client(&config.portal)?;
    let client = create_retryable_http_client(&config.http_retry_config, base_client);
    let source = PortalBlockSource::new(&config.portal, config.batch_size, client)?;
    tracing::info!(retry_policy = ?config.http_retry_config, "Portal block source initialized with retry policy.");

    let supervisor = Supervisor::builder()
        .config(config)
        .store(store.clone())
        .source(Arc::new(source))
        .build()?;

    tracing::info!("Supervisor initialized, starting pipeline...");
    let result = supervisor.run().await;

    store.close().await;
    result?;

    Ok(())
}
