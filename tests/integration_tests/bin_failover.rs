// SPDX-License-Identifier: AGPL-3.0-or-later

//! `spec.md` §8 end-to-end scenario 2: BIN-based failover.

use std::{
    sync::{atomic::AtomicU32, Arc},
    time::Duration,
};

use authz_router::{model::ResponseCode, screen::NoopScreen, wire::FieldId};

use super::common::{spawn_router, RegionSetup, StubProcessor};

#[tokio::test]
async fn fails_over_to_a_healthy_region_when_primary_is_open() {
    let router = spawn_router(
        vec![("4", "us")],
        "default",
        vec![
            RegionSetup {
                name: "us",
                client: Arc::new(StubProcessor {
                    delay: Duration::from_millis(1),
                    response_code: ResponseCode::DoNotHonor,
                    calls: Arc::new(AtomicU32::new(0)),
                }),
                timeout: Duration::from_secs(1),
            },
            RegionSetup {
                name: "eu",
                client: Arc::new(StubProcessor {
                    delay: Duration::from_millis(1),
                    response_code: ResponseCode::Approved,
                    calls: Arc::new(AtomicU32::new(0)),
                }),
                timeout: Duration::from_secs(1),
            },
        ],
        vec![("us", "eu")],
        Arc::new(NoopScreen),
    )
    .await;

    // Trip `us` open: 5 consecutive failures within error_window.
    for _ in 0..5 {
        router.health.record_failure("us");
    }
    assert!(!router.health.is_healthy("us"));
    assert!(router.health.is_healthy("eu"));

    let reply = router.send("0100", "4111111111111111", "000000005000", "000002").await;
    assert_eq!(reply.get(FieldId::ResponseCode), Some("00"));

    let row = router.wait_for_audit_row("000002").await;
    assert_eq!(row.region, "eu");

    router.shutdown();
}
