use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soloq_tracker::api::state::AppState;
use soloq_tracker::api::build_router;
use soloq_tracker::config::AppConfig;
use soloq_tracker::dashboard::DashboardService;
use soloq_tracker::db;

#[derive(Parser)]
#[command(name = "soloq-tracker")]
#[command(about = "Esports solo-queue statistics dashboard API")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address; overrides the config file
        #[arg(long)]
        host: Option<String>,

        /// Port number; overrides the config file
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration file and exit
    CheckConfig,
}

fn load_config(path: &PathBuf) -> Result<AppConfig> {
    if path.exists() {
        Ok(AppConfig::from_file(path)?)
    } else {
        Ok(AppConfig::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting soloq-tracker v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let pool = db::connect(&config.database)
                .await
                .context("failed to connect to the database")?;
            let state = AppState {
                service: Arc::new(DashboardService::new(pool, &config)),
            };
            let app = build_router(state, &config.server);

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::CheckConfig => {
            config.validate()?;
            println!("Configuration OK");
            println!("  server:    {}:{}", config.server.host, config.server.port);
            println!("  database:  {} connections max", config.database.max_connections);
            println!("  cache ttl: {}s", config.cache.ttl_seconds);
            println!(
                "  timeouts:  single {}ms, batch {}ms",
                config.query.single_timeout_ms, config.query.batch_timeout_ms
            );
        }
    }

    Ok(())
}
