//! vocab-curator - Main entry point
//!
//! Loads the TOML config, the JSON-LD schema and the SQLite database, then
//! serves the curation HTTP API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocab_common::config::{default_config_path, load_config, write_toml_config};
use vocab_curator::db::init_database_pool;
use vocab_curator::schema_provider::JsonLdSchemaProvider;
use vocab_curator::{build_router, AppState};

/// Command-line arguments for vocab-curator
#[derive(Parser, Debug)]
#[command(name = "vocab-curator")]
#[command(about = "Controlled vocabulary curation service")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "VOCAB_CURATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides [server] bind)
    #[arg(short, long, env = "VOCAB_CURATOR_BIND")]
    bind: Option<String>,

    /// SQLite database file (overrides [database] path)
    #[arg(short, long, env = "VOCAB_CURATOR_DATABASE")]
    database: Option<PathBuf>,

    /// JSON-LD schema file (overrides [schema] path)
    #[arg(short, long, env = "VOCAB_CURATOR_SCHEMA")]
    schema: Option<PathBuf>,

    /// Write the effective config to the config file and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load config")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }
    if let Some(schema) = args.schema {
        config.schema.path = schema;
    }

    // RUST_LOG wins over [logging] level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.write_config {
        let path = args
            .config
            .clone()
            .or_else(default_config_path)
            .context("No config path: pass --config")?;
        write_toml_config(&config, &path).context("Failed to write config")?;
        info!("Config written to {}", path.display());
        return Ok(());
    }

    info!("Starting vocab-curator v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {}", config.database.path.display());
    info!("Schema path: {}", config.schema.path.display());

    let schema = JsonLdSchemaProvider::load(&config.schema.path)
        .await
        .context("Failed to load schema")?;

    let pool = init_database_pool(&config.database.path)
        .await
        .context("Failed to open database")?;

    let bind = config.server.bind.clone();
    let state = AppState::new(pool, schema, config);
    // Fail fast on an engine/policy config that cannot be built
    state.workflow().context("Invalid engine configuration")?;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("vocab-curator listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
