//! Kanban API server binary.
//!
//! Wires the Postgres-backed stores (or in-memory ones with `--ephemeral`)
//! into the HTTP router and runs the revocation GC alongside it.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kanban_api::config::ApiConfig;
use kanban_core::auth::jwt::{TokenKeys, resolve_jwt_secret};
use kanban_core::auth::memory::{MemoryBoardDirectory, MemoryRevocationStore, MemoryUserStore};
use kanban_core::auth::ownership::{BoardDirectory, OwnershipResolver};
use kanban_core::auth::queries::{PgBoardDirectory, PgRevocationStore, PgUserStore};
use kanban_core::auth::revocation::{RevocationStore, spawn_gc};
use kanban_core::auth::session::{SessionConfig, SessionService};
use kanban_core::auth::users::UserStore;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "kanban_api_server", about = "Kanban API server")]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/kanban"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Deadline for each store call, in seconds.
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = 5)]
    store_timeout_secs: u64,

    /// Interval between sweeps of expired revocation and refresh rows.
    #[arg(
        long,
        env = "GC_INTERVAL_SECS",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    gc_interval_secs: u64,

    /// Keep everything in memory instead of Postgres. State is lost on exit.
    #[arg(long, default_value_t = false)]
    ephemeral: bool,
}

type Stores = (
    Arc<dyn RevocationStore>,
    Arc<dyn UserStore>,
    Arc<dyn BoardDirectory>,
);

async fn connect_stores(args: &Args) -> Result<Stores, Box<dyn std::error::Error>> {
    if args.ephemeral {
        warn!("ephemeral mode: sessions and users live in memory only");
        let revocations: Arc<dyn RevocationStore> = Arc::new(MemoryRevocationStore::new());
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        let boards: Arc<dyn BoardDirectory> = Arc::new(MemoryBoardDirectory::new());
        return Ok((revocations, users, boards));
    }

    info!(max_connections = args.max_connections, "configuring connection pool");
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    kanban_core::migrate::migrate(&pool).await?;

    let revocations: Arc<dyn RevocationStore> = Arc::new(PgRevocationStore::new(pool.clone()));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let boards: Arc<dyn BoardDirectory> = Arc::new(PgBoardDirectory::new(pool));
    Ok((revocations, users, boards))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kanban_api=debug,kanban_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(host, _)| host);
        config.bind_addr = format!("{host}:{port}");
    }
    info!(bind_addr = %config.bind_addr, ephemeral = args.ephemeral, "starting kanban_api_server");

    let (revocations, users, boards) = connect_stores(&args).await?;

    let store_timeout = Duration::from_secs(args.store_timeout_secs);
    let sessions = SessionService::new(
        TokenKeys::new(resolve_jwt_secret().as_bytes()),
        revocations.clone(),
        users,
        SessionConfig {
            store_timeout,
            ..SessionConfig::default()
        },
    );

    let state = kanban_api::AppState {
        sessions: Arc::new(sessions),
        resources: Arc::new(OwnershipResolver::new(boards, store_timeout)),
        config: config.clone(),
    };
    let app = kanban_api::router(state);

    let ct = CancellationToken::new();
    let gc_handle = spawn_gc(
        revocations,
        Duration::from_secs(args.gc_interval_secs),
        ct.clone(),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let shutdown = ct.clone();
    let api_result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown requested");
            shutdown.cancel();
        })
        .await;

    // When the REST API exits, also stop the GC task.
    ct.cancel();
    if let Err(e) = gc_handle.await {
        error!(error = %e, "revocation gc task failed");
    }

    api_result?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_gc_interval_is_rejected() {
        let err = Args::try_parse_from(["kanban_api_server", "--gc-interval-secs", "0"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn gc_interval_accepts_positive_values() {
        let args = Args::try_parse_from(["kanban_api_server", "--gc-interval-secs", "1"]).unwrap();
        assert_eq!(args.gc_interval_secs, 1);
    }
}
