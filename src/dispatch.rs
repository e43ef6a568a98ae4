// SPDX-License-Identifier: AGPL-3.0-or-later

//! C6: the dispatcher (`spec.md` §4.6). Per request: resolve primary or
//! failover region, place a bounded-deadline RPC, update C5, translate
//! the reply. Audit persistence is not this module's concern — every
//! outcome flows back up to the workflow runtime (`workflow::Workflow`),
//! which writes exactly one audit record per terminal path (`spec.md`
//! §9, "Audit on timeout").

use std::{collections::HashMap, sync::Arc, time::Duration};

use tracing::warn;

use crate::{
    error::RouterError,
    health::HealthRegistry,
    model::{mti, InternalRequest, InternalResponse, ResponseCode},
    processor::ProcessorClient,
    route::RouteTable,
};

/// Per-region dispatch configuration: the RPC client and its bounded
/// deadline (`regions[name].timeout_ms` in `spec.md` §6).
pub struct RegionTarget {
    pub client: Arc<dyn ProcessorClient>,
    pub timeout: Duration,
}

pub struct Dispatcher {
    routes: RouteTable,
    health: Arc<HealthRegistry>,
    failover_map: HashMap<String, String>,
    targets: HashMap<String, RegionTarget>,
}

impl Dispatcher {
    pub fn new(
        routes: RouteTable,
        health: Arc<HealthRegistry>,
        failover_map: HashMap<String, String>,
        targets: HashMap<String, RegionTarget>,
    ) -> Self {
        Self {
            routes,
            health,
            failover_map,
            targets,
        }
    }

    /// Runs `spec.md` §4.6 steps 1-7 for one request. `request.region` is
    /// set to the chosen target before the RPC is placed and is left set
    /// to that value on return, regardless of outcome.
    pub async fn dispatch(&self, request: &mut InternalRequest) -> Result<InternalResponse, RouterError> {
        let primary = self.routes.resolve(&request.pan).to_string();
        request.region = Some(primary.clone());

        let target = if self.health.is_healthy(&primary) {
            primary
        } else {
            match self.failover_map.get(&primary) {
                Some(failover) if self.health.is_healthy(failover) => failover.clone(),
                _ => primary,
            }
        };
        request.region = Some(target.clone());

        let Some(region_target) = self.targets.get(&target) else {
            return Err(RouterError::RoutingFault { region: target });
        };

        let started = std::time::Instant::now();
        match tokio::time::timeout(region_target.timeout, region_target.client.process_auth(request)).await {
            Ok(Ok(mut response)) => {
                self.health.record_success(&target);
                response.processing_time_ms = started.elapsed().as_millis() as u64;
                Ok(response)
            },
            Ok(Err(err)) => {
                self.health.record_failure(&target);
                Err(err)
            },
            Err(_elapsed) => {
                self.health.record_failure(&target);
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(region = target, elapsed_ms, "region RPC deadline exceeded");
                Ok(timeout_decline(request, &target, started.elapsed()))
            },
        }
    }
}

/// `spec.md` §4.6 step 6: a timeout produces a *declined* reply, not a
/// thrown error — `39 = "91"`, reply `mti`, every other field echoed
/// from the request.
fn timeout_decline(request: &InternalRequest, _target: &str, elapsed: Duration) -> InternalResponse {
    InternalResponse {
        mti: request.reply_mti(),
        pan: request.pan.clone(),
        amount: request.amount.clone(),
        transmission_time: request.transmission_time.clone(),
        stan: request.stan.clone(),
        response_code: ResponseCode::SwitchInoperative,
        processing_time_ms: elapsed.as_millis() as u64,
    }
}

/// `spec.md` §4.8: a no-op network-management probe against one region.
/// Shared by the dispatcher's target lookup and the periodic health
/// probe so both honor the same timeout configuration.
pub fn probe_request(stan: &str) -> InternalRequest {
    InternalRequest {
        mti: mti::NETWORK_MANAGEMENT_REQUEST.to_string(),
        pan: String::new(),
        amount: "000000000000".to_string(),
        transmission_time: "0000000000".to_string(),
        stan: stan.to_string(),
        region: None,
    }
}
