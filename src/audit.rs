// SPDX-License-Identifier: AGPL-3.0-or-later

//! C9: the audit sink contract (`spec.md` §4.9, §9 "Dynamic dispatch").
//! The store implementation is out of scope (`spec.md` §1); this module
//! specifies `SaveAuthorization`/`GetTransaction`/`Close` plus a no-op
//! and an in-memory reference implementation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

use crate::{error::RouterError, model::AuditRecord};

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Insert-or-update by `record.stan` (`spec.md` §4.9). The store
    /// assigns `inserted_at` at commit.
    async fn save_authorization(&self, record: AuditRecord) -> Result<(), RouterError>;

    /// Absence is not an error.
    async fn get_transaction(&self, stan: &str) -> Result<Option<AuditRecord>, RouterError>;

    async fn close(&self) -> Result<(), RouterError>;
}

/// Discards every write. A valid configuration when no audit
/// collaborator is wired up (`spec.md` §9).
#[derive(Debug, Default)]
pub struct NoopAuditStore;

#[async_trait]
impl AuditStore for NoopAuditStore {
    async fn save_authorization(&self, _record: AuditRecord) -> Result<(), RouterError> {
        Ok(())
    }

    async fn get_transaction(&self, _stan: &str) -> Result<Option<AuditRecord>, RouterError> {
        Ok(None)
    }

    async fn close(&self) -> Result<(), RouterError> {
        Ok(())
    }
}

/// A process-local store keyed by `stan`, for tests and for running the
/// router without an external store wired up. Insert-or-update is a
/// plain `DashMap::insert`; `inserted_at` is stamped at the moment of
/// the call, standing in for a store-assigned commit timestamp.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    rows: DashMap<String, AuditRecord>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn save_authorization(&self, mut record: AuditRecord) -> Result<(), RouterError> {
        record.inserted_at = Some(chrono::Utc::now());
        self.rows.insert(record.stan.clone(), record);
        Ok(())
    }

    async fn get_transaction(&self, stan: &str) -> Result<Option<AuditRecord>, RouterError> {
        Ok(self.rows.get(stan).map(|entry| entry.value().clone()))
    }

    async fn close(&self) -> Result<(), RouterError> {
        Ok(())
    }
}

/// Persists `record` on a detached task so that store latency never
/// blocks the reply (`spec.md` §4.9: "The dispatcher invokes it in a
/// detached task"). Failures are logged, never surfaced to the caller
/// (`spec.md` §7: "Audit faults ... logged only; never visible to the
/// caller").
pub fn spawn_save(store: Arc<dyn AuditStore>, record: AuditRecord) {
    let stan = record.stan.clone();
    tokio::spawn(async move {
        if let Err(err) = store.save_authorization(record).await {
            warn!(stan, error = %err, "audit write failed");
        }
    });
}
