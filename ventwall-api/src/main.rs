use crate::server::ServerState;
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ventwall_common::snowflake::{ProcessId, WorkerId};
use ventwall_db::{Store, pg::PgStore};

mod server;
mod sweeper;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error connecting to the database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    worker_id: WorkerId,
    process_id: ProcessId,
    #[serde(default = "default_sweep_interval_seconds")]
    sweep_interval_seconds: u64,
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ventwall_api=debug,ventwall_db=debug,ventwall_common=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let pool = sqlx::PgPool::connect(&env.database_url).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool, env.worker_id, env.process_id));

    let cancellation = CancellationToken::new();
    let sweeper_handle = tokio::spawn(sweeper::run(
        Arc::clone(&store),
        Duration::from_secs(env.sweep_interval_seconds),
        cancellation.clone(),
    ));

    let app = server::routes()
        .with_state(ServerState { store })
        .layer(TraceLayer::new_for_http());

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancellation))
        .await
        .map_err(InitError::TcpServe)?;

    // The sweeper was cancelled together with the server.
    let _ = sweeper_handle.await;

    Ok(())
}

async fn shutdown_signal(cancellation: CancellationToken) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }

    cancellation.cancel();
}
