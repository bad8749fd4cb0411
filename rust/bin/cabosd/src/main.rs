//! `cabosd`: the cable inventory server binary.
//!
//! Usage:
//!   cabosd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/cabos/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use cabos_core::Module;
use tracing::info;

use config::ServerConfig;
use routes::AppState;

/// Cable inventory server.
#[derive(Parser, Debug)]
#[command(name = "cabosd", about = "Cable box inventory server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address.
    #[arg(long = "listen", default_value = cabos_core::config::DEFAULT_LISTEN)]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    let core_config = server_config.storage.layout().with_listen(cli.listen);
    core_config.prepare_dirs()?;

    let sql: Arc<dyn cabos_sql::SQLStore> = Arc::new(
        cabos_sql::SqliteStore::open(&core_config.sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    let blob: Arc<dyn cabos_blob::BlobStore> = Arc::new(
        cabos_blob::FileStore::open(&core_config.blob_dir())
            .map_err(|e| anyhow::anyhow!("failed to open blob store: {}", e))?,
    );

    let inventory_module = inventory::InventoryModule::new(sql, blob)?;
    info!("Inventory module initialized");

    let module_routes = vec![(inventory_module.name(), inventory_module.routes())];

    let app_state = AppState {
        company: Arc::new(server_config.company),
    };
    let app = routes::build_router(app_state, module_routes);

    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("cabosd listening on {}", core_config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install ctrl-c handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
