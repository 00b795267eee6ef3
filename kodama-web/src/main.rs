use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use kodama_web::config::WebConfig;
use kodama_web::state::AppState;

#[derive(Parser)]
#[command(name = "kodama-web", about = "Dashboard for Kodama instances and nodes")]
struct Cli {
    /// Path to config file (default: ~/.config/kodama/panel.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Directory holding nodes.json and instances.json
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = WebConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    info!(data_dir = %config.data_dir.display(), "loaded config");

    let state = AppState::with_config(&config.data_dir, config.heartbeat_timeout);

    // Load initial data
    state.reload().await;

    // Start file watcher (keep handle alive)
    let _watcher = kodama_web::start_file_watcher(state.clone())?;

    let app = match config.static_dir.as_deref().filter(|dir| dir.exists()) {
        Some(static_dir) => {
            info!("Serving static files from {}", static_dir.display());
            kodama_web::build_router_with_static(state, static_dir)
        }
        None => {
            info!("No frontend build found, serving API only");
            kodama_web::build_router(state)
        }
    };

    info!("kodama-web listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
