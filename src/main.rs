//! Zona Xtreme backend binary entrypoint wiring REST, SSE and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zona_xtreme_back::{
    config::AppConfig,
    dao::venue_store::memory::MemoryVenueStore,
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "mongo".into());
    match backend.to_ascii_lowercase().as_str() {
        "memory" => {
            info!("using in-memory storage; data is lost on restart");
            storage_supervisor::install(&app_state, Arc::new(MemoryVenueStore::new()))
                .await
                .context("preparing in-memory storage")?;
        }
        "mongo" | "mongodb" => spawn_mongo_supervisor(&app_state).await?,
        other => anyhow::bail!("unsupported STORAGE_BACKEND `{other}` (expected `mongo` or `memory`)"),
    }

    // Build the HTTP router once the shared state is ready.
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

/// Connect to MongoDB in the background, staying in degraded mode until it answers.
#[cfg(feature = "mongo-store")]
async fn spawn_mongo_supervisor(state: &SharedState) -> anyhow::Result<()> {
    use zona_xtreme_back::dao::{
        storage::StorageError,
        venue_store::{
            VenueStore,
            mongodb::{MongoConfig, MongoVenueStore},
        },
    };

    let mongo_config = MongoConfig::from_env()
        .await
        .context("reading MongoDB settings")?;
    info!(database = %mongo_config.database_name, "using MongoDB storage");

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let config = mongo_config.clone();
        async move {
            MongoVenueStore::connect(config)
                .await
                .map(|store| Arc::new(store) as Arc<dyn VenueStore>)
                .map_err(StorageError::from)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
async fn spawn_mongo_supervisor(_state: &SharedState) -> anyhow::Result<()> {
    anyhow::bail!("built without the `mongo-store` feature; set STORAGE_BACKEND=memory")
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
