//! The console refresh agent: keeps the locally cached snapshot of the
//! remote engine loosely synchronized on a page-aware cadence.

/// The collaborator adapters towards the remote engine.
pub(crate) mod client;

use agents::controller::registry::Registry;
use clap::Parser;
use console_port::types::{DelayConfig, RefreshFlags, TargetPage};
use std::sync::Arc;

/// The Cli arguments for this binary.
#[derive(Debug, Parser)]
pub(crate) struct CliArgs {
    /// The fixed delay between refresh ticks.
    #[clap(long, short, default_value = "60s")]
    pub(crate) refresh_period: humantime::Duration,

    /// The minimum engine API version the agent refreshes against.
    #[clap(long, default_value = "4.2")]
    pub(crate) min_api_version: String,

    /// The remote engine REST endpoint to synchronize from.
    #[clap(long, short, default_value = "http://localhost:8080/api/")]
    pub(crate) engine_url: url::Url,

    /// The session token used towards the remote engine.
    #[clap(long, env = "ENGINE_TOKEN", default_value = "")]
    pub(crate) token: String,

    /// The lifetime of the session token.
    #[clap(long, default_value = "30m")]
    pub(crate) token_lifetime: humantime::Duration,

    /// The timeout for remote engine requests.
    #[clap(long, default_value = "10s")]
    pub(crate) request_timeout: humantime::Duration,
}
impl CliArgs {
    fn args() -> Self {
        CliArgs::parse()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli_args = CliArgs::args();
    init_tracing();
    server(cli_args).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

async fn server(cli_args: CliArgs) -> anyhow::Result<()> {
    tracing::info!(?cli_args, "Starting the console refresh agent");
    let client = Arc::new(client::EngineClient::new(&cli_args)?);
    let session = Arc::new(client::EngineSession::new(&cli_args, &client).await?);
    let registry = Registry::new(
        client,
        session,
        Arc::new(client::LogNotifications {}),
        Arc::new(client::LogMessages {}),
    );

    registry.start().await;
    registry
        .start_scheduler(
            DelayConfig::new(cli_args.refresh_period.into()),
            TargetPage::list(),
            RefreshFlags::page_router(),
        )
        .await?;

    shutdown_signal().await;
    registry.stop().await;
    Ok(())
}

/// Waits until the process receives a shutdown: either TERM or INT.
async fn shutdown_signal() {
    let mut sig_term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("to register SIGTERM");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(signal = "SIGINT", "Signalled");
        },
        _ = sig_term.recv() => {
            tracing::warn!(signal = "SIGTERM", "Signalled");
        },
    }
}
