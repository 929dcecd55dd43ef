//! OAS stub server: loads configuration, registers the configured
//! applications and serves the stub routes.
//!
//! Configuration is read from the YAML file given by `--config`, then from
//! environment variables prefixed `OAS_STUB__` (`__` separates nesting
//! levels, e.g. `OAS_STUB__STUB__PREFIX=/mocks`).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use oas_stub::OasStubModule;
use oas_stub::config::OasStubConfig;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "oas-stub-server", version, about = "OpenAPI-driven HTTP stub server")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on; overrides `server.listen`.
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerConfig {
    #[serde(default)]
    server: ListenConfig,
    #[serde(default)]
    stub: OasStubConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListenConfig {
    #[serde(default = "default_listen")]
    listen: SocketAddr,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ServerConfig> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        figment = figment.merge(Yaml::file_exact(path));
    }
    figment
        .merge(Env::prefixed("OAS_STUB__").split("__"))
        .extract()
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = load_config(cli.config.as_ref())?;
    info!(config = ?config.stub, "configuration loaded");

    let module = OasStubModule::init(&config.stub).await?;
    let listen = cli.listen.unwrap_or(config.server.listen);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!(%listen, prefix = %module.config().prefix, "OAS stub server listening");

    axum::serve(listener, module.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("OAS stub server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
