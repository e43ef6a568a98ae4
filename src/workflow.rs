// SPDX-License-Identifier: AGPL-3.0-or-later

//! C7: the durable workflow runtime (`spec.md` §4.7, §9 "Coroutine /
//! async control flow"). One workflow instance per inbound request,
//! sequencing `screen -> dispatch -> audit` with per-step retry and
//! search attributes.
//!
//! A durable-continuation engine with cross-process replay is out of
//! scope (`spec.md` §1 excludes "the persistent store implementation");
//! this runtime instead models the sequence as the explicit finite state
//! machine the design notes call for, persisting each transition as a
//! structured `tracing` event rather than to an external workflow store.
//! That event stream is the "search attributes" surface (`spec.md` §4.7)
//! external tooling queries against.

use std::{sync::Arc, time::Duration};

use tracing::{info, info_span, Instrument};

use crate::{
    audit,
    audit::AuditStore,
    dispatch::Dispatcher,
    model::{AuditRecord, InternalRequest, InternalResponse, ResponseCode},
    retry::RetryPolicy,
    screen::{Screen, ScreenOutcome},
};

#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    pub screen_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub execution_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            screen_timeout: Duration::from_secs(2),
            dispatch_timeout: Duration::from_secs(10),
            execution_timeout: Duration::from_secs(5 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Explicit workflow states (`spec.md` §9): each transition is logged
/// before the next step begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkflowState {
    Started,
    Screened,
    Dispatched,
    Completed,
}

pub struct Workflow {
    config: WorkflowConfig,
    screen: Arc<dyn Screen>,
    dispatcher: Arc<Dispatcher>,
    audit_store: Arc<dyn AuditStore>,
}

impl Workflow {
    pub fn new(
        config: WorkflowConfig,
        screen: Arc<dyn Screen>,
        dispatcher: Arc<Dispatcher>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            config,
            screen,
            dispatcher,
            audit_store,
        }
    }

    /// Runs all three steps for `request`. Never returns `Err`: every
    /// failure is encoded as a response code (`spec.md` §4.7
    /// "Termination", §9 "Exceptions for control flow").
    pub async fn run(&self, mut request: InternalRequest) -> InternalResponse {
        let span = info_span!(
            "workflow",
            stan = %request.stan,
            card_prefix = %request.card_prefix(),
            amount = %request.amount,
        );
        let outcome = tokio::time::timeout(self.config.execution_timeout, self.run_steps(&mut request))
            .instrument(span.clone())
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(_elapsed) => {
                info!(parent: &span, "workflow execution_timeout exceeded");
                synthesize(&request, ResponseCode::SystemMalfunction)
            },
        };

        self.audit(&request, &response);
        response
    }

    async fn run_steps(&self, request: &mut InternalRequest) -> InternalResponse {
        let mut state = WorkflowState::Started;
        info!(state = ?state, "workflow started");

        let screen_outcome = self.run_screen(request).await;
        state = WorkflowState::Screened;
        info!(state = ?state, status = ?screen_outcome, "screen complete");

        if let ScreenStepOutcome::Reject = screen_outcome {
            let response = synthesize(request, ResponseCode::SuspectedFraud);
            info!(state = ?WorkflowState::Completed, response_code = %response.response_code, approved = false, "workflow complete");
            return response;
        }

        let response = match self.run_dispatch(request).await {
            Ok(response) => response,
            Err(_final_err) => synthesize(request, ResponseCode::SystemMalfunction),
        };
        state = WorkflowState::Dispatched;
        info!(state = ?state, response_code = %response.response_code, "dispatch complete");

        info!(
            state = ?WorkflowState::Completed,
            response_code = %response.response_code,
            approved = response.response_code.is_approved(),
            "workflow complete"
        );
        response
    }

    /// Step 1: screen with deadline 2 s, retried under the default policy.
    /// A rejection short-circuits to a synthetic decline; an error that
    /// persists through retries fails open and tags the workflow rather
    /// than blocking the authorization (`spec.md` §4.7 step 1: "after
    /// retries").
    async fn run_screen(&self, request: &InternalRequest) -> ScreenStepOutcome {
        let timeout = self.config.screen_timeout;
        let screen = &self.screen;
        let outcome = self
            .config
            .retry
            .run("screen", || async {
                match tokio::time::timeout(timeout, screen.analyze(request)).await {
                    Ok(Ok(outcome)) => Ok(outcome),
                    Ok(Err(err)) => Err(err),
                    Err(_elapsed) => Err(crate::error::RouterError::ScreenFault {
                        reason: "screen deadline exceeded".to_string(),
                    }),
                }
            })
            .await;
        match outcome {
            Ok(ScreenOutcome::Pass) => ScreenStepOutcome::Pass,
            Ok(ScreenOutcome::Reject) => ScreenStepOutcome::Reject,
            Err(err) => {
                info!(error = %err, "screen error: failing open after retries");
                ScreenStepOutcome::ErrorFailOpen
            },
        }
    }

    /// Step 2: dispatch with deadline 10 s and the default retry policy.
    /// `Dispatcher::dispatch` already encodes the timeout-decline policy
    /// internally (`spec.md` §4.6 step 6); retries here cover the
    /// "regional errors" class (`spec.md` §7).
    async fn run_dispatch(&self, request: &mut InternalRequest) -> Result<InternalResponse, crate::error::RouterError> {
        let dispatcher = &self.dispatcher;
        let deadline = self.config.dispatch_timeout;
        self.config
            .retry
            .run_if(
                "dispatch",
                // The region-client map is fixed after startup, so a routing
                // or configuration fault fails identically on every attempt
                // (`spec.md` §4.6 step 3, §7: both are non-retryable).
                |err: &crate::error::RouterError| {
                    !matches!(
                        err,
                        crate::error::RouterError::RoutingFault { .. } | crate::error::RouterError::Configuration(_)
                    )
                },
                || async {
                    let mut attempt_request = request.clone();
                    let result = tokio::time::timeout(deadline, dispatcher.dispatch(&mut attempt_request)).await;
                    *request = attempt_request;
                    match result {
                        Ok(inner) => inner,
                        Err(_elapsed) => Err(crate::error::RouterError::RegionTimeout {
                            region: request.region.clone().unwrap_or_default(),
                            elapsed_ms: deadline.as_millis() as u64,
                        }),
                    }
                },
            )
            .await
    }

    /// Step 3: persist an audit record on every terminal path, including
    /// synthetic declines (`spec.md` §9, "Audit on timeout", resolving
    /// the open question against the source's success-path-only write).
    /// The write is detached so its latency never delays the reply that
    /// already left on the connection (`spec.md` §4.9).
    fn audit(&self, request: &InternalRequest, response: &InternalResponse) {
        let record = AuditRecord {
            stan: request.stan.clone(),
            pan: request.pan.clone(),
            amount: request.amount.clone(),
            region: request.region.clone().unwrap_or_default(),
            approved: response.response_code.is_approved(),
            transmission_time: request.transmission_time.clone(),
            inserted_at: None,
        };
        audit::spawn_save(self.audit_store.clone(), record);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScreenStepOutcome {
    Pass,
    Reject,
    ErrorFailOpen,
}

/// Builds a synthetic decline reply: reply `mti`, every other field
/// echoed from the request, the given response code.
fn synthesize(request: &InternalRequest, code: ResponseCode) -> InternalResponse {
    InternalResponse {
        mti: request.reply_mti(),
        pan: request.pan.clone(),
        amount: request.amount.clone(),
        transmission_time: request.transmission_time.clone(),
        stan: request.stan.clone(),
        response_code: code,
        processing_time_ms: 0,
    }
}
