// SPDX-License-Identifier: AGPL-3.0-or-later

//! Health gauge export (`spec.md` §5: "the metrics registry, which is
//! append-only"). Metrics exposition itself is out of scope (`spec.md`
//! §1); this module specifies only the `GaugeSink` capability and a
//! tracing-event default, matching how the teacher crate's logger
//! carries structured fields instead of standing up a scrape server.

use crate::health::HealthSnapshot;

pub trait GaugeSink: Send + Sync {
    fn record_region_health(&self, region: &str, snapshot: HealthSnapshot);
}

/// Emits one `tracing` event per call. Downstream log processors are
/// expected to aggregate these into whatever metrics backend the
/// deployment uses; this router does not run a scrape endpoint.
#[derive(Debug, Default)]
pub struct TracingGaugeSink;

impl GaugeSink for TracingGaugeSink {
    fn record_region_health(&self, region: &str, snapshot: HealthSnapshot) {
        tracing::info!(
            region,
            state = ?snapshot.state,
            consecutive_failures = snapshot.consecutive_failures,
            recent_error_count = snapshot.recent_error_count,
            "region_health_gauge"
        );
    }
}
