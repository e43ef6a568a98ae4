// SPDX-License-Identifier: AGPL-3.0-or-later

//! C8: the periodic health probe (`spec.md` §4.8). A background task
//! ticks on an interval and sends one concurrent no-op RPC per region to
//! refresh C5, independent of any live traffic.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{dispatch::probe_request, health::HealthRegistry, observability::GaugeSink, processor::ProcessorClient};

#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            deadline: Duration::from_secs(5),
        }
    }
}

/// Runs until `cancel` fires. Each tick probes every region in
/// `clients` concurrently with a network-management request (`mti =
/// "0800"`), records the outcome against `health`, and exports the
/// resulting snapshot through `gauges` (`spec.md` §4.8, §9 "Metrics").
/// Probes never produce audit records.
pub async fn run(
    config: ProbeConfig,
    health: Arc<HealthRegistry>,
    clients: HashMap<String, Arc<dyn ProcessorClient>>,
    gauges: Arc<dyn GaugeSink>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.interval);
    let mut tick_id: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("health probe shutting down");
                return;
            },
            _ = ticker.tick() => {
                tick_id += 1;
                probe_all(&config, &health, &clients, &gauges, tick_id).await;
            },
        }
    }
}

async fn probe_all(
    config: &ProbeConfig,
    health: &Arc<HealthRegistry>,
    clients: &HashMap<String, Arc<dyn ProcessorClient>>,
    gauges: &Arc<dyn GaugeSink>,
    tick_id: u64,
) {
    let mut probes = Vec::with_capacity(clients.len());
    for (region, client) in clients {
        let health = health.clone();
        let client = client.clone();
        let region = region.clone();
        let deadline = config.deadline;
        let stan = format!("{:06}", tick_id % 1_000_000);
        probes.push(tokio::spawn(async move {
            let request = probe_request(&stan);
            match tokio::time::timeout(deadline, client.process_auth(&request)).await {
                Ok(Ok(_)) => health.record_success(&region),
                Ok(Err(err)) => {
                    warn!(region, error = %err, "health probe RPC failed");
                    health.record_failure(&region);
                },
                Err(_elapsed) => {
                    warn!(region, "health probe RPC timed out");
                    health.record_failure(&region);
                },
            }
            region
        }));
    }
    for probe in probes {
        if let Ok(region) = probe.await {
            if let Some(snapshot) = health.snapshot(&region) {
                gauges.record_region_health(&region, snapshot);
            }
        }
    }
}
