//! status-server - monitoring status page
//!
//! Renders the status page of a Prometheus-style server once to stdout, or
//! serves it over HTTP.

use anyhow::Context;
use clap::{Parser, Subcommand};
use status_server::{create_router, AppState};
use status_view::config::{AppConfig, ENV_PREFIX};
use status_view::{fetch_status, render_document, render_page, FieldFormatter, HttpClient, PageState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "status-server")]
#[command(about = "Status page for Prometheus-style monitoring servers", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (.toml, .yaml, .yml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the monitored server
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Path prefix the server's API is mounted under
    #[arg(long, global = true)]
    path_prefix: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the status once and print it as HTML
    Render {
        /// Print a complete HTML document instead of the page body
        #[arg(long)]
        document: bool,
    },

    /// Serve the status page over HTTP
    Serve {
        /// Address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `render` output stays clean.
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(rust_log)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    config.apply_env(ENV_PREFIX)?;
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }
    if let Some(prefix) = cli.path_prefix {
        config.path_prefix = prefix;
    }
    if let Commands::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.listen.host = host.clone();
        }
        if let Some(port) = port {
            config.listen.port = *port;
        }
    }
    config.validate()?;

    tracing::debug!(
        server_url = %config.server_url,
        path_prefix = %config.path_prefix,
        "configuration loaded"
    );

    let client = HttpClient::new(&config.server_url, config.client.clone())?;

    match cli.command {
        Commands::Render { document } => render(client, &config, document).await,
        Commands::Serve { .. } => serve(client, &config).await,
    }
}

async fn render(client: HttpClient, config: &AppConfig, document: bool) -> anyhow::Result<()> {
    let fetch = fetch_status(&client, &config.path_prefix).await;
    let body = render_page(&fetch, &FieldFormatter::status_page());

    if document {
        print!("{}", render_document(&body));
    } else {
        println!("{}", body);
    }

    if let PageState::Failed(message) = fetch.page_state() {
        anyhow::bail!("error fetching status from {}: {}", config.server_url, message);
    }
    Ok(())
}

async fn serve(client: HttpClient, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.listen.host, config.listen.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.listen.host, config.listen.port))?;

    let app = create_router(AppState::new(Arc::new(client), config.path_prefix.as_str()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, server_url = %config.server_url, "status server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("status server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
