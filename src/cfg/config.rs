// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{health::HealthPolicy, retry::RetryPolicy, route::RouteTable, server::ConnectionConfig, workflow::WorkflowConfig};

/// Recognized configuration options (`spec.md` §6 "Configuration").
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RouterConfig {
    pub server: ServerConfig,

    #[serde(rename = "bin_routes")]
    pub bin_routes: HashMap<String, String>,
    pub default_region: String,
    pub regions: HashMap<String, RegionConfig>,
    #[serde(default)]
    pub failover_map: HashMap<String, String>,

    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub chaos: ChaosSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegionConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
}

/// C2's listen address and per-connection deadlines (`spec.md` §9.3).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    #[serde(with = "serde_secs", default = "default_idle_deadline_secs")]
    pub idle_deadline_secs: Duration,
    #[serde(with = "serde_secs", default = "default_shutdown_drain_secs")]
    pub shutdown_drain_secs: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8583".to_string(),
            idle_deadline_secs: default_idle_deadline_secs(),
            shutdown_drain_secs: default_shutdown_drain_secs(),
        }
    }
}

impl ServerConfig {
    pub fn as_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            idle_deadline: self.idle_deadline_secs,
            drain_deadline: self.shutdown_drain_secs,
        }
    }
}

fn default_idle_deadline_secs() -> Duration {
    Duration::from_secs(30)
}
fn default_shutdown_drain_secs() -> Duration {
    Duration::from_secs(15)
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HealthConfig {
    #[serde(with = "serde_secs", default = "default_health_interval")]
    pub interval: Duration,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(with = "serde_secs", default = "default_reset_timeout")]
    pub reset_timeout: Duration,
    #[serde(with = "serde_secs", default = "default_error_window")]
    pub error_window: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: default_health_interval(),
            failure_threshold: default_failure_threshold(),
            reset_timeout: default_reset_timeout(),
            error_window: default_error_window(),
        }
    }
}

impl HealthConfig {
    pub fn as_policy(&self) -> HealthPolicy {
        HealthPolicy {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            error_window: self.error_window,
        }
    }
}

fn default_health_interval() -> Duration {
    Duration::from_secs(10)
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_reset_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_error_window() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkflowSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(with = "serde_millis", default = "default_retry_interval")]
    pub retry_interval: Duration,
    #[serde(with = "serde_secs", default = "default_screen_timeout")]
    pub screen_timeout: Duration,
    #[serde(with = "serde_secs", default = "default_dispatch_timeout")]
    pub dispatch_timeout: Duration,
    #[serde(with = "serde_secs", default = "default_execution_timeout")]
    pub execution_timeout: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_interval: default_retry_interval(),
            screen_timeout: default_screen_timeout(),
            dispatch_timeout: default_dispatch_timeout(),
            execution_timeout: default_execution_timeout(),
        }
    }
}

impl WorkflowSettings {
    pub fn as_workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            screen_timeout: self.screen_timeout,
            dispatch_timeout: self.dispatch_timeout,
            execution_timeout: self.execution_timeout,
            retry: RetryPolicy {
                max_attempts: self.max_retries,
                initial_interval: self.retry_interval,
                ..RetryPolicy::default()
            },
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_interval() -> Duration {
    Duration::from_millis(500)
}
fn default_screen_timeout() -> Duration {
    Duration::from_secs(2)
}
fn default_dispatch_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_execution_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

/// Testing-only fault injection (`spec.md` §6).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ChaosSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub fault_probability: f64,
    #[serde(default)]
    pub max_delay_ms: u64,
}

impl From<&ChaosSettings> for crate::chaos::ChaosConfig {
    fn from(settings: &ChaosSettings) -> Self {
        crate::chaos::ChaosConfig {
            enabled: settings.enabled,
            fault_probability: settings.fault_probability,
            max_delay_ms: settings.max_delay_ms,
        }
    }
}

impl RouterConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        let mut cfg: RouterConfig = serde_yaml::from_str(&raw).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates cross-field invariants that `serde` cannot express:
    /// `default_region` and every route/failover target must name a
    /// configured region, and the route table itself must be
    /// unambiguous (`route::RouteTable::build`).
    pub fn validate(&mut self) -> Result<()> {
        ensure!(!self.regions.is_empty(), "at least one region must be configured");
        ensure!(
            self.regions.contains_key(&self.default_region),
            "default_region {:?} is not a configured region",
            self.default_region
        );
        for region in self.failover_map.values() {
            ensure!(
                self.regions.contains_key(region),
                "failover target {region:?} is not a configured region"
            );
        }
        for region in self.bin_routes.values() {
            ensure!(
                self.regions.contains_key(region),
                "bin_routes target {region:?} is not a configured region"
            );
        }

        self.route_table()
            .map_err(|e| anyhow::anyhow!("route table invalid: {e}"))?;
        Ok(())
    }

    pub fn route_table(&self) -> crate::error::Result<RouteTable> {
        RouteTable::build(
            self.bin_routes.iter().map(|(k, v)| (k.clone(), v.clone())),
            self.default_region.clone(),
        )
    }
}

mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
