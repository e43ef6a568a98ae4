// SPDX-License-Identifier: AGPL-3.0-or-later

//! C5: region health tracker, a three-state circuit breaker (`spec.md`
//! §4.5). Process-wide, created once at startup as a `HealthRegistry` and
//! passed explicitly to the dispatcher, workflow, and health probe — no
//! ambient/global access (Design Note "Global mutable state").

use std::{
    collections::{HashMap, VecDeque},
    sync::RwLock,
    time::{Duration, Instant},
};

use tracing::{debug, info};

/// `spec.md` §3 `RegionHealth.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct RegionHealthState {
    state: CircuitState,
    consecutive_failures: u32,
    recent_errors: VecDeque<Instant>,
    last_state_change: Instant,
}

impl RegionHealthState {
    fn new(now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            recent_errors: VecDeque::new(),
            last_state_change: now,
        }
    }

    fn evict_expired_errors(&mut self, now: Instant, window: Duration) {
        while let Some(front) = self.recent_errors.front() {
            if now.duration_since(*front) > window {
                self.recent_errors.pop_front();
            } else {
                break;
            }
        }
    }
}

/// A point-in-time read of one region's health, for gauge export
/// (`spec.md` §4.5: "`recent_errors` ... used by the exported health
/// gauge but not by the state machine").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub recent_error_count: usize,
}

/// Tunables for the circuit breaker, defaulting to `spec.md` §4.5's
/// defaults (`failure_threshold = 5`, `reset_timeout = 30s`,
/// `error_window = 60s`).
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub error_window: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            error_window: Duration::from_secs(60),
        }
    }
}

/// Process-wide registry of per-region circuit breakers, each guarded by
/// its own `RwLock` (`spec.md` §5: "`RegionHealth` is guarded by a
/// readers-writer lock per region").
#[derive(Debug)]
pub struct HealthRegistry {
    regions: HashMap<String, RwLock<RegionHealthState>>,
    policy: HealthPolicy,
}

impl HealthRegistry {
    /// Builds a registry with one entry per name in `region_names`, all
    /// starting `Closed`.
    pub fn new(region_names: impl IntoIterator<Item = impl Into<String>>, policy: HealthPolicy) -> Self {
        let now = Instant::now();
        let regions = region_names
            .into_iter()
            .map(|name| (name.into(), RwLock::new(RegionHealthState::new(now))))
            .collect();
        Self { regions, policy }
    }

    fn lock(&self, region: &str) -> Option<&RwLock<RegionHealthState>> {
        self.regions.get(region)
    }

    /// `spec.md` §4.5 transition table: `Closed -RecordSuccess-> Closed`,
    /// `HalfOpen -RecordSuccess-> Closed` (forces `consecutive_failures =
    /// 0`). A region with no registry entry is a configuration bug in the
    /// caller; recorded as a no-op rather than a panic, matching the
    /// teacher's preference for propagated errors over panics in
    /// non-test code, since this is a metrics-adjacent path with no
    /// caller-visible `Result`.
    pub fn record_success(&self, region: &str) {
        let Some(lock) = self.lock(region) else {
            return;
        };
        let mut state = lock.write().unwrap_or_else(|e| e.into_inner());
        if state.state != CircuitState::Closed {
            debug!(region, from = ?state.state, "region health: -> Closed");
        }
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
    }

    /// `spec.md` §4.5 transition table: in `Closed`, a failure trips
    /// `Open` once `consecutive_failures >= failure_threshold`; in
    /// `HalfOpen`, any failure re-opens immediately.
    pub fn record_failure(&self, region: &str) {
        let Some(lock) = self.lock(region) else {
            return;
        };
        let now = Instant::now();
        let mut state = lock.write().unwrap_or_else(|e| e.into_inner());
        state.evict_expired_errors(now, self.policy.error_window);
        state.recent_errors.push_back(now);
        state.consecutive_failures += 1;

        match state.state {
            CircuitState::Closed if state.consecutive_failures >= self.policy.failure_threshold => {
                state.state = CircuitState::Open;
                state.last_state_change = now;
                info!(region, "region health: Closed -> Open");
            },
            CircuitState::HalfOpen => {
                state.state = CircuitState::Open;
                state.last_state_change = now;
                info!(region, "region health: HalfOpen -> Open");
            },
            _ => {},
        }
    }

    /// `spec.md` §4.5: `true` iff the state is `Closed` or `HalfOpen`.
    /// `Open -> HalfOpen` is a lazy transition evaluated here: it fires
    /// once `reset_timeout` has elapsed since `last_state_change`.
    /// Racing with a concurrent `RecordFailure`/`RecordSuccess` is
    /// acceptable (`spec.md` §5): the observed state "may race with a
    /// concurrent transition ... it only biases selection slightly".
    pub fn is_healthy(&self, region: &str) -> bool {
        let Some(lock) = self.lock(region) else {
            return false;
        };
        {
            let state = lock.read().unwrap_or_else(|e| e.into_inner());
            if state.state != CircuitState::Open {
                return matches!(state.state, CircuitState::Closed | CircuitState::HalfOpen);
            }
        }
        // Possibly due for Open -> HalfOpen; re-check under the write lock.
        let now = Instant::now();
        let mut state = lock.write().unwrap_or_else(|e| e.into_inner());
        if state.state == CircuitState::Open && now.duration_since(state.last_state_change) > self.policy.reset_timeout {
            state.state = CircuitState::HalfOpen;
            state.last_state_change = now;
            info!(region, "region health: Open -> HalfOpen");
        }
        matches!(state.state, CircuitState::Closed | CircuitState::HalfOpen)
    }

    pub fn snapshot(&self, region: &str) -> Option<HealthSnapshot> {
        let lock = self.lock(region)?;
        let state = lock.read().unwrap_or_else(|e| e.into_inner());
        Some(HealthSnapshot {
            state: state.state,
            consecutive_failures: state.consecutive_failures,
            recent_error_count: state.recent_errors.len(),
        })
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }
}
