//! Trackdle Back binary entrypoint wiring REST, WebSocket, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod external;
mod routes;
mod services;
mod state;

use config::AppConfig;
use external::{StaticTrackSource, StaticUserDirectory};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let directory = Arc::new(StaticUserDirectory::from_seed(config.seed_users()));
    let tracks = Arc::new(StaticTrackSource::from_seed(config.seed_tracks()));
    let app_state = AppState::new(config, directory, tracks);

    spawn_storage(app_state.clone());
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Supervise a MongoDB-backed store, toggling degraded mode with connectivity.
#[cfg(feature = "mongo-store")]
fn spawn_storage(state: SharedState) {
    use dao::{
        mongodb::{MongoConfig, MongoDocumentStore},
        storage::StorageError,
        store::DocumentStore,
    };

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();

    tokio::spawn(services::storage_supervisor::run(state, move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref())
                .await
                .map_err(StorageError::from)?;
            let store = MongoDocumentStore::connect(config)
                .await
                .map_err(StorageError::from)?;
            Ok(Arc::new(store) as Arc<dyn DocumentStore>)
        }
    }));
}

/// Without a database backend everything lives in process memory.
#[cfg(not(feature = "mongo-store"))]
fn spawn_storage(state: SharedState) {
    use dao::memory::MemoryStore;

    tokio::spawn(async move {
        state.install_store(Arc::new(MemoryStore::new())).await;
        info!("in-memory store installed");
    });
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
