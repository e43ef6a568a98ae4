// SPDX-License-Identifier: AGPL-3.0-or-later

//! `spec.md` §8 end-to-end scenario 3: timeout -> 91.

use std::{
    sync::{atomic::AtomicU32, Arc},
    time::Duration,
};

use authz_router::{model::ResponseCode, screen::NoopScreen, wire::FieldId};

use super::common::{spawn_router, RegionSetup, StubProcessor};

#[tokio::test]
async fn deadline_exceeded_declines_with_91_and_still_audits() {
    let router = spawn_router(
        vec![("4", "us")],
        "default",
        vec![RegionSetup {
            name: "us",
            client: Arc::new(StubProcessor {
                delay: Duration::from_millis(500),
                response_code: ResponseCode::Approved,
                calls: Arc::new(AtomicU32::new(0)),
            }),
            timeout: Duration::from_millis(100),
        }],
        vec![],
        Arc::new(NoopScreen),
    )
    .await;

    let reply = router.send("0100", "4111111111111111", "000000005000", "000003").await;
    assert_eq!(reply.get(FieldId::ResponseCode), Some("91"));

    let row = router.wait_for_audit_row("000003").await;
    assert!(!row.approved);
    assert!(router.health.is_healthy("us"), "a single timeout alone does not trip the breaker");

    router.shutdown();
}
