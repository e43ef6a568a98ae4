// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error taxonomy for the router (see `spec.md` §7).
//!
//! `RouterError` is the typed boundary between a module and its callers,
//! the way `thiserror`-based enums sit at the edges of the teacher crate's
//! PDU parsers. It never crosses the workflow boundary into a reply frame:
//! every variant is converted into a response code at or before step 3 of
//! the workflow (`workflow::Workflow::run`).

use std::fmt;

use thiserror::Error;

/// Per-message or per-connection fault, tagged with the correlation key
/// when one is known.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Malformed frame or a required field (2, 4, 7, 11) missing.
    /// Per-message: the frame is dropped, the connection stays open.
    #[error("parse fault: {reason}")]
    ParseFault { reason: String },

    /// Short read mid-payload or a socket error. Per-connection: the
    /// connection is closed, other connections are unaffected.
    #[error("stream fault: {0}")]
    StreamFault(#[source] std::io::Error),

    /// No RPC client configured for the selected region. Non-retryable.
    #[error("routing fault: no client configured for region {region}")]
    RoutingFault { region: String },

    /// The regional RPC exceeded its deadline.
    #[error("region {region} timed out after {elapsed_ms}ms")]
    RegionTimeout { region: String, elapsed_ms: u64 },

    /// The regional RPC failed for a reason other than a timeout.
    #[error("region {region} error: {reason}")]
    RegionError { region: String, reason: String },

    /// The fraud screen itself failed (not: rejected) after retries.
    #[error("screen fault: {reason}")]
    ScreenFault { reason: String },

    /// The audit sink failed to persist a record. Logged only; never
    /// visible to the caller.
    #[error("audit fault for stan {stan}: {reason}")]
    AuditFault { stan: String, reason: String },

    /// A configuration-time fault: ambiguous route table, dangling region
    /// reference, or similar. Raised at startup, never at request time.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl RouterError {
    pub fn parse(reason: impl Into<String>) -> Self {
        RouterError::ParseFault {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl fmt::Display) -> Self {
        RouterError::Configuration(reason.to_string())
    }

    /// True for faults that close the owning TCP connection (`spec.md`
    /// §7, "Stream faults").
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, RouterError::StreamFault(_))
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
