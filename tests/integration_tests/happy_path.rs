// SPDX-License-Identifier: AGPL-3.0-or-later

//! `spec.md` §8 end-to-end scenario 1: happy path.

use std::{
    sync::{atomic::AtomicU32, Arc},
    time::Duration,
};

use authz_router::{model::ResponseCode, screen::NoopScreen, wire::FieldId};

use super::common::{spawn_router, RegionSetup, StubProcessor};

#[tokio::test]
async fn approves_and_audits_with_serving_region() {
    let router = spawn_router(
        vec![("4", "us")],
        "default",
        vec![RegionSetup {
            name: "us",
            client: Arc::new(StubProcessor {
                delay: Duration::from_millis(1),
                response_code: ResponseCode::Approved,
                calls: Arc::new(AtomicU32::new(0)),
            }),
            timeout: Duration::from_secs(1),
        }],
        vec![],
        Arc::new(NoopScreen),
    )
    .await;

    let reply = router.send("0100", "4111111111111111", "000000005000", "000001").await;
    assert_eq!(reply.get(FieldId::Mti), Some("0110"));
    assert_eq!(reply.get(FieldId::Stan), Some("000001"));
    assert_eq!(reply.get(FieldId::ResponseCode), Some("00"));

    let row = router.wait_for_audit_row("000001").await;
    assert_eq!(row.region, "us");
    assert!(row.approved);

    router.shutdown();
}
