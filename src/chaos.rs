// SPDX-License-Identifier: AGPL-3.0-or-later

//! Test-only fault injection (`spec.md` §6 configuration: `chaos.enabled`,
//! `chaos.fault_probability`, `chaos.max_delay_ms`). Never enabled by
//! default; wired into a `ProcessorClient` test double, not into the
//! dispatcher itself, so production code paths carry no chaos branches.

use rand::Rng;

use crate::error::RouterError;

#[derive(Debug, Clone, Copy)]
pub struct ChaosConfig {
    pub enabled: bool,
    pub fault_probability: f64,
    pub max_delay_ms: u64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fault_probability: 0.0,
            max_delay_ms: 0,
        }
    }
}

impl ChaosConfig {
    /// Sleeps a random interval up to `max_delay_ms`, then with
    /// probability `fault_probability` returns an error standing in for
    /// a regional RPC failure. A no-op when `enabled` is false.
    pub async fn maybe_inject(&self, region: &str) -> Result<(), RouterError> {
        if !self.enabled {
            return Ok(());
        }
        if self.max_delay_ms > 0 {
            let delay_ms = rand::rng().random_range(0..=self.max_delay_ms);
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
        if rand::rng().random_bool(self.fault_probability.clamp(0.0, 1.0)) {
            return Err(RouterError::RegionError {
                region: region.to_string(),
                reason: "chaos fault injected".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_chaos_never_faults() {
        let chaos = ChaosConfig::default();
        for _ in 0..20 {
            assert!(chaos.maybe_inject("us").await.is_ok());
        }
    }

    #[tokio::test]
    async fn full_probability_always_faults() {
        let chaos = ChaosConfig {
            enabled: true,
            fault_probability: 1.0,
            max_delay_ms: 0,
        };
        assert!(chaos.maybe_inject("us").await.is_err());
    }
}
