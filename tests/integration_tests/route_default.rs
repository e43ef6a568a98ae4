// SPDX-License-Identifier: AGPL-3.0-or-later

//! `spec.md` §8 end-to-end scenario 6: route default for a short PAN.

use std::{
    sync::{atomic::AtomicU32, Arc},
    time::Duration,
};

use authz_router::{model::ResponseCode, screen::NoopScreen, wire::FieldId};

use super::common::{spawn_router, RegionSetup, StubProcessor};

#[tokio::test]
async fn short_pan_routes_to_default_region() {
    let router = spawn_router(
        vec![("4", "us")],
        "default",
        vec![RegionSetup {
            name: "default",
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

    let reply = router.send("0100", "1234", "000000005000", "000006").await;
    assert_eq!(reply.get(FieldId::ResponseCode), Some("00"));

    let row = router.wait_for_audit_row("000006").await;
    assert_eq!(row.region, "default");

    router.shutdown();
}
