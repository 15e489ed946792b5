//! Sentinel guardian server binary.
//!
//! Loads the guardian configuration, wires the HTTP reasoning backend with
//! headless sensor collaborators, and serves the guardian HTTP surface.

use sentinel::gateway::HttpReasoningBackend;
use sentinel::orchestrator::{GuardianOrchestrator, GuardianSinks};
use sentinel::{GuardianConfig, ReasoningGateway, server};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = GuardianConfig::load_or_default()?;
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address {:?}: {e}", config.server.bind_addr))?;

    let backend = Arc::new(HttpReasoningBackend::new(&config.gateway));
    let gateway = Arc::new(ReasoningGateway::new(backend, &config.gateway));

    let mut sinks = GuardianSinks::headless();
    if let Some(relay) = &config.emergency.alert_relay_url {
        sinks.notifier = Arc::new(sentinel::alert::HttpAlertClient::new(relay));
    }

    let orchestrator = Arc::new(GuardianOrchestrator::new(gateway, sinks, &config));

    tracing::info!(
        reasoning = config.gateway.base_url.as_str(),
        model = config.gateway.model.as_str(),
        "sentinel guardian starting"
    );
    server::serve(orchestrator, addr).await?;
    Ok(())
}
