// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared harness for end-to-end scenarios (`spec.md` §8 "End-to-end
//! scenarios"): spins up the real C2 listener over a real TCP socket,
//! backed by in-memory stand-ins for the processor, screen, and audit
//! store.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use authz_router::{
    audit::{AuditStore, InMemoryAuditStore},
    dispatch::{Dispatcher, RegionTarget},
    error::RouterError,
    health::{HealthPolicy, HealthRegistry},
    model::{AuditRecord, InternalRequest, InternalResponse, ResponseCode},
    processor::ProcessorClient,
    route::RouteTable,
    screen::{Screen, ScreenOutcome},
    server::{self, ConnectionConfig},
    translate,
    wire::{read_frame, write_frame, Frame},
    workflow::{Workflow, WorkflowConfig},
};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

pub struct StubProcessor {
    pub delay: Duration,
    pub response_code: ResponseCode,
    pub calls: Arc<AtomicU32>,
}

#[async_trait]
impl ProcessorClient for StubProcessor {
    async fn process_auth(&self, request: &InternalRequest) -> Result<InternalResponse, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(InternalResponse {
            mti: request.reply_mti(),
            pan: request.pan.clone(),
            amount: request.amount.clone(),
            transmission_time: request.transmission_time.clone(),
            stan: request.stan.clone(),
            response_code: self.response_code,
            processing_time_ms: 0,
        })
    }

    async fn get_transaction(&self, _stan: &str) -> Result<Option<AuditRecord>, RouterError> {
        Ok(None)
    }
}

/// Errors on its first `fail_first` calls, then succeeds — used to
/// exercise the workflow's dispatch retry policy.
pub struct FlakyProcessor {
    pub fail_first: u32,
    pub calls: Arc<AtomicU32>,
}

#[async_trait]
impl ProcessorClient for FlakyProcessor {
    async fn process_auth(&self, request: &InternalRequest) -> Result<InternalResponse, RouterError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(RouterError::RegionError {
                region: "us".to_string(),
                reason: "simulated transient failure".to_string(),
            });
        }
        Ok(InternalResponse {
            mti: request.reply_mti(),
            pan: request.pan.clone(),
            amount: request.amount.clone(),
            transmission_time: request.transmission_time.clone(),
            stan: request.stan.clone(),
            response_code: ResponseCode::Approved,
            processing_time_ms: 0,
        })
    }

    async fn get_transaction(&self, _stan: &str) -> Result<Option<AuditRecord>, RouterError> {
        Ok(None)
    }
}

pub struct RejectingScreen;

#[async_trait]
impl Screen for RejectingScreen {
    async fn analyze(&self, _request: &InternalRequest) -> Result<ScreenOutcome, RouterError> {
        Ok(ScreenOutcome::Reject)
    }
}

pub struct RouterUnderTest {
    pub addr: SocketAddr,
    pub audit_store: Arc<InMemoryAuditStore>,
    pub health: Arc<HealthRegistry>,
    shutdown: CancellationToken,
}

pub struct RegionSetup {
    pub name: &'static str,
    pub client: Arc<dyn ProcessorClient>,
    pub timeout: Duration,
}

/// Starts a real listener on an OS-assigned loopback port, wired to a
/// `Workflow` built from the given regions/screen. Callers drive it over
/// an actual `TcpStream`, exercising C1 through C9 together.
pub async fn spawn_router(
    bin_routes: Vec<(&str, &str)>,
    default_region: &str,
    regions: Vec<RegionSetup>,
    failover_map: Vec<(&str, &str)>,
    screen: Arc<dyn Screen>,
) -> RouterUnderTest {
    let routes = RouteTable::build(
        bin_routes.into_iter().map(|(k, v)| (k.to_string(), v.to_string())),
        default_region.to_string(),
    )
    .expect("valid route table");

    let region_names: Vec<String> = regions.iter().map(|r| r.name.to_string()).collect();
    let health = Arc::new(HealthRegistry::new(region_names, HealthPolicy::default()));

    let mut targets = HashMap::new();
    for region in regions {
        targets.insert(
            region.name.to_string(),
            RegionTarget {
                client: region.client,
                timeout: region.timeout,
            },
        );
    }

    let failover_map = failover_map.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let dispatcher = Arc::new(Dispatcher::new(routes, health.clone(), failover_map, targets));

    let audit_store = Arc::new(InMemoryAuditStore::new());
    let workflow = Arc::new(Workflow::new(WorkflowConfig::default(), screen, dispatcher, audit_store.clone() as Arc<dyn AuditStore>));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let shutdown = CancellationToken::new();

    let serve_shutdown = shutdown.clone();
    tokio::spawn(async move {
        server::serve(listener, workflow, ConnectionConfig::default(), serve_shutdown).await;
    });

    RouterUnderTest {
        addr,
        audit_store,
        health,
        shutdown,
    }
}

impl RouterUnderTest {
    pub async fn send(&self, mti: &str, pan: &str, amount: &str, stan: &str) -> Frame {
        let mut stream = TcpStream::connect(self.addr).await.expect("connect to router under test");
        let request = InternalRequest {
            mti: mti.to_string(),
            pan: pan.to_string(),
            amount: amount.to_string(),
            transmission_time: "0728120000".to_string(),
            stan: stan.to_string(),
            region: None,
        };
        let frame = translate::request_to_frame(&request).expect("encode request");
        write_frame(&mut stream, &frame).await.expect("write request");
        read_frame(&mut stream).await.expect("read reply").expect("connection open")
    }

    pub async fn wait_for_audit_row(&self, stan: &str) -> AuditRecord {
        for _ in 0..200 {
            if let Some(row) = self.audit_store.get_transaction(stan).await.expect("store read") {
                return row;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no audit row for stan {stan} within the wait budget");
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
