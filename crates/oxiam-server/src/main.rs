use anyhow::Result;
use chrono::Utc;
use oxiam_common::roles::{RolesRegistry, StaticRoles};
use oxiam_storage::entity_manager::EntityManager;
use oxiam_storage::store::UserStore;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use oxiam_server::app;
use oxiam_server::config::ServerConfig;
use oxiam_server::fixtures;
use oxiam_server::resources::UsersController;
use oxiam_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  oxiam-server [config.toml]                Start the server");
    eprintln!("  oxiam-server init-fixtures <config.toml>  Seed roles, user groups and test users");
}

#[tokio::main]
async fn main() -> Result<()> {
    oxiam_common::id::init(1, 1);

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-fixtures") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-fixtures requires a <config.toml> argument")
            })?;
            run_init_fixtures(config_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();
    Ok(())
}

/// Seed the fixture data set once. Refuses to touch a database that
/// already has roles.
async fn run_init_fixtures(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    init_tracing(&config.logging.level)?;
    if !Path::new(config_path).exists() {
        tracing::warn!(path = %config_path, "Config file not found, using built-in defaults");
    }

    let db_url = config.database.connection_url();
    let store = UserStore::new(&db_url, Path::new(&config.database.data_dir)).await?;
    let entity_manager = EntityManager::new(store.connection());

    if store.count_roles().await? > 0 {
        tracing::warn!("Database already contains roles, skipping fixture load");
        return Ok(());
    }

    let roles: Arc<dyn RolesRegistry> = Arc::new(StaticRoles::new(config.fixtures.roles.clone()));
    let refs = fixtures::run_fixtures(&entity_manager, roles).await?;
    tracing::info!(references = refs.len(), "init-fixtures completed");
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    init_tracing(&config.logging.level)?;
    if !Path::new(config_path).exists() {
        tracing::warn!(path = %config_path, "Config file not found, using built-in defaults");
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        data_dir = %config.database.data_dir,
        db = %config.database.redacted_url(),
        "oxiam-server starting"
    );

    let db_url = config.database.connection_url();
    let store = Arc::new(UserStore::new(&db_url, Path::new(&config.database.data_dir)).await?);
    let entity_manager = Arc::new(EntityManager::new(store.connection()));

    // Seed fixture data on first start (only when the roles table is empty)
    if config.fixtures.seed_on_start {
        match store.count_roles().await {
            Ok(0) => {
                let roles: Arc<dyn RolesRegistry> =
                    Arc::new(StaticRoles::new(config.fixtures.roles.clone()));
                match fixtures::run_fixtures(&entity_manager, roles).await {
                    Ok(refs) => {
                        tracing::info!(references = refs.len(), "Seeded fixture data");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to seed fixture data");
                    }
                }
            }
            Ok(count) => {
                tracing::info!(count, "Roles table already populated, skipping fixture seeding");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to check roles table");
            }
        }
    }

    let users = Arc::new(UsersController::new(store.clone(), entity_manager.clone()));
    let state = AppState {
        store,
        entity_manager,
        users,
        start_time: Utc::now(),
        config: Arc::new(config.clone()),
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(http = %addr, "Server started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        signal::ctrl_c().await.ok();
    })
    .await?;

    tracing::info!("Server stopped");

    Ok(())
}
