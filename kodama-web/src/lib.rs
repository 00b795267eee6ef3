pub mod api;
pub mod config;
pub mod state;
pub mod ws;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::state::AppState;

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health))
        .route("/nodes", get(api::list_nodes))
        .route("/nodes/{id}", get(api::get_node))
        .route("/nodes/{id}/instances", get(api::get_node_instances))
        .route("/instances", get(api::list_instances))
        .route("/instances/{id}", get(api::get_instance))
        .route("/tables/instances", get(api::instance_table))
        .route("/tables/nodes", get(api::node_table))
        .route("/rejected", get(api::list_rejected))
}

/// Build the Axum router with all routes
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build the router with static file serving for a prebuilt frontend
pub fn build_router_with_static(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws", get(ws::ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Watches the data directory and feeds change events to a single reload task.
///
/// Dropping it stops the watcher, which closes the channel and ends the task.
pub struct DataWatcher {
    _watcher: RecommendedWatcher,
    _reload_handle: JoinHandle<()>,
}

/// Start the file watcher that reloads the snapshot when the exports change.
///
/// Returns `None` only when the state has no data directory. A missing
/// directory is created so exports written later are still picked up.
pub fn start_file_watcher(state: Arc<AppState>) -> anyhow::Result<Option<DataWatcher>> {
    let Some(data_dir) = state.data_dir().map(Path::to_path_buf) else {
        return Ok(None);
    };

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir: {}", data_dir.display()))?;

    // One slot: a burst of events collapses into a single pending reload
    let (tx, mut rx) = mpsc::channel::<()>(1);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(_) => {
                let _ = tx.try_send(());
            }
            Err(e) => tracing::warn!(error = %e, "file watch error"),
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    )?;

    watcher
        .watch(&data_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching data dir: {}", data_dir.display()))?;
    tracing::info!(dir = %data_dir.display(), "watching data directory");

    let reload_handle = tokio::spawn(async move {
        while rx.recv().await.is_some() {
            state.reload().await;
        }
    });

    Ok(Some(DataWatcher {
        _watcher: watcher,
        _reload_handle: reload_handle,
    }))
}
