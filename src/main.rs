// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use authz_router::{
    audit::InMemoryAuditStore,
    cfg::{cli::resolve_config_path, config::RouterConfig, logger::init_logger},
    dispatch::{Dispatcher, RegionTarget},
    health::HealthRegistry,
    observability::TracingGaugeSink,
    probe,
    processor::TcpProcessorClient,
    screen::NoopScreen,
    server,
    workflow::Workflow,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _logger_guard = init_logger("config/logger.yaml").context("failed to initialize logger")?;

    let config_path = resolve_config_path("config/router.yaml").context("failed to resolve config path")?;
    let config = RouterConfig::load_from_file(&config_path).context("failed to load router config")?;

    let health = Arc::new(HealthRegistry::new(config.regions.keys().cloned(), config.health.as_policy()));

    let mut clients: HashMap<String, Arc<dyn authz_router::processor::ProcessorClient>> = HashMap::new();
    let mut targets = HashMap::new();
    for (name, region) in &config.regions {
        let client = Arc::new(
            TcpProcessorClient::connect(&region.host, region.port)
                .await
                .with_context(|| format!("failed to connect to region {name}"))?,
        );
        clients.insert(name.clone(), client.clone());
        targets.insert(
            name.clone(),
            RegionTarget {
                client,
                timeout: std::time::Duration::from_millis(region.timeout_ms),
            },
        );
    }

    let routes = config.route_table().context("invalid route table")?;
    let dispatcher = Arc::new(Dispatcher::new(routes, health.clone(), config.failover_map.clone(), targets));

    let workflow = Arc::new(Workflow::new(
        config.workflow.as_workflow_config(),
        Arc::new(NoopScreen),
        dispatcher,
        Arc::new(InMemoryAuditStore::new()),
    ));

    let shutdown = CancellationToken::new();

    let probe_handle = tokio::spawn(probe::run(
        probe::ProbeConfig {
            interval: config.health.interval,
            deadline: std::time::Duration::from_secs(5),
        },
        health.clone(),
        clients,
        Arc::new(TracingGaugeSink),
        shutdown.clone(),
    ));

    let listener = TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "router listening");

    let serve_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        serve_shutdown.cancel();
    });

    server::serve(listener, workflow, config.server.as_connection_config(), shutdown).await;
    let _ = probe_handle.await;

    Ok(())
}
