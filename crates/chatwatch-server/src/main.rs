//! Chatwatch: watches a chat-support page for neglected chats and serves the
//! background message API.

use anyhow::Result;
use axum::Router;
use chatwatch_core::{AlarmSink, MonitorConfig, PageMonitor, SnapshotSource};
use chatwatch_server::{config, coordinator, logging, routes, state};
use chatwatch_types::TabId;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use config::Config;
use logging::{LogConfig, LogFormat};
use state::AppState;

/// Chat inactivity monitor and background coordinator.
#[derive(Parser, Debug)]
#[command(name = "chatwatch")]
#[command(about = "Watches a chat-support page and alerts on chats left unanswered")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Page to monitor: an HTML file or an http(s) URL
    #[arg(long, value_name = "PATH|URL")]
    page: Option<String>,

    /// Tab id reported with alerts from the monitored page
    #[arg(long, default_value_t = 0)]
    tab_id: TabId,

    /// Enable verbose logging (INFO level for most targets)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging (TRACE level for everything)
    #[arg(long)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "scanner=debug" or "phones=trace").
    /// Can be specified multiple times. Targets are prefixed with "chatwatch::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    tracing::info!(target: "chatwatch::startup", "Loaded configuration (port: {})", config.port);

    let state = Arc::new(AppState::new(config.clone()).await?);
    tracing::info!(
        target: "chatwatch::startup",
        "Settings stored at {}",
        config.settings_path.display()
    );

    if let Some(page) = cli.page.as_deref() {
        spawn_monitor(state.clone(), SnapshotSource::from_arg(page), cli.tab_id)?;
    }

    let app = Router::new()
        .nest("/api", routes::api_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(target: "chatwatch::startup", "Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Start the page monitor and the task that feeds its alarms to the coordinator.
fn spawn_monitor(state: Arc<AppState>, source: SnapshotSource, tab_id: TabId) -> Result<()> {
    let (sink, rx) = AlarmSink::channel(64, tab_id);
    let monitor = PageMonitor::new(
        source,
        sink,
        state.subscribe_settings(),
        state.extractor.clone(),
        MonitorConfig {
            poll_interval: state.config.poll_interval(),
            windows: state.config.debounce,
        },
    )?;

    tokio::spawn(coordinator::drain(state, rx));
    tokio::spawn(monitor.run());
    tracing::info!(target: "chatwatch::startup", "Started page monitor (tab {})", tab_id);
    Ok(())
}
