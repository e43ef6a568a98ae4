// SPDX-License-Identifier: AGPL-3.0-or-later

use authz_router::cfg::config::RouterConfig;

const SAMPLE_YAML: &str = r#"
server:
  listen_addr: "0.0.0.0:8583"
bin_routes:
  "4": us
default_region: us
regions:
  us:
    host: us.internal
    port: 9000
    timeout_ms: 2000
  eu:
    host: eu.internal
    port: 9000
    timeout_ms: 2000
failover_map:
  us: eu
"#;

fn write_temp_yaml(name: &str, contents: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("authz-router-test-{name}-{}.yaml", std::process::id()));
    std::fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn loads_and_validates_a_well_formed_config() {
    let path = write_temp_yaml("ok", SAMPLE_YAML);
    let cfg = RouterConfig::load_from_file(&path).expect("loads");
    assert_eq!(cfg.default_region, "us");
    assert_eq!(cfg.regions.len(), 2);
    assert_eq!(cfg.health.failure_threshold, 5, "defaults applied when omitted");
    assert_eq!(cfg.server.idle_deadline_secs, std::time::Duration::from_secs(30));
    assert_eq!(cfg.server.shutdown_drain_secs, std::time::Duration::from_secs(15));
    let _ = std::fs::remove_file(path);
}

#[test]
fn rejects_a_bin_route_pointing_at_an_unconfigured_region() {
    let yaml = SAMPLE_YAML.replace("\"4\": us", "\"4\": nowhere");
    let path = write_temp_yaml("bad-route", &yaml);
    let err = RouterConfig::load_from_file(&path);
    assert!(err.is_err());
    let _ = std::fs::remove_file(path);
}
