//! Retail recommendation setup.
//!
//! Prepares datasets, trains recommenders and deploys campaigns on a managed
//! recommendation service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, build_object_store};
use database::{create_pool, run_migrations};
use personalize_client::{AwsAccessProvisioner, AwsPersonalizeClient, PersonalizeApi, load_sdk_config};
use retail_personalize::commands;
use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

/// Retail recommendation setup
#[derive(Parser)]
#[command(name = "retail-personalize")]
#[command(about = "Sets up retail recommendations on a managed recommendation service")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the local datasets
    Explore {
        /// Directory holding the CSV files (defaults to `PERSONALIZE_DATA_DIR`)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Register schemas and datasets, upload the CSV files and import them
    DataLayer,

    /// Train solutions and deploy campaigns and the purchase filter
    TrainingLayer,

    /// Show the recorded resources
    Status {
        /// Re-read every status from the service first
        #[arg(short, long)]
        refresh: bool,
    },

    /// Run database migrations
    Migrate,
}

fn init_tracing(verbose: bool, log_file: Option<&PathBuf>) -> Result<()> {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stdout);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;

            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(file),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

async fn open_state_store(config: &Config) -> Result<SqlitePool> {
    let pool = create_pool(&config.state_url)
        .await
        .with_context(|| format!("Failed to open state store {}", config.state_url))?;
    run_migrations(&pool).await?;

    Ok(pool)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(cli.verbose, config.log_file.as_ref())?;

    match cli.command {
        Commands::Explore { data_dir } => {
            commands::explore::run(data_dir.as_deref().unwrap_or(&config.data_dir))?;
        }
        Commands::DataLayer => {
            let pool = open_state_store(&config).await?;
            let sdk_config = load_sdk_config(config.region.as_deref()).await;
            let api = AwsPersonalizeClient::new(&sdk_config);
            let access = AwsAccessProvisioner::new(&sdk_config);
            let store = build_object_store(&config)?;

            commands::data_layer::run(&config, &pool, &api, &access, store.as_ref()).await?;
        }
        Commands::TrainingLayer => {
            let pool = open_state_store(&config).await?;
            let sdk_config = load_sdk_config(config.region.as_deref()).await;
            let api = AwsPersonalizeClient::new(&sdk_config);

            commands::training_layer::run(&config, &pool, &api).await?;
        }
        Commands::Status { refresh } => {
            let pool = open_state_store(&config).await?;
            let api = if refresh {
                let sdk_config = load_sdk_config(config.region.as_deref()).await;
                Some(AwsPersonalizeClient::new(&sdk_config))
            } else {
                None
            };

            commands::status::run(&pool, api.as_ref().map(|api| api as &dyn PersonalizeApi)).await?;
        }
        Commands::Migrate => {
            let pool = create_pool(&config.state_url).await?;
            run_migrations(&pool).await?;
            info!("Migrations completed successfully");
        }
    }

    Ok(())
}
