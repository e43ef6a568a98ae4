// SPDX-License-Identifier: AGPL-3.0-or-later

//! `spec.md` §8 end-to-end scenario 4: screen reject -> 59.

use std::{
    sync::{atomic::AtomicU32, Arc},
    time::Duration,
};

use authz_router::{model::ResponseCode, wire::FieldId};

use super::common::{spawn_router, RegionSetup, RejectingScreen, StubProcessor};

#[tokio::test]
async fn reject_declines_with_59_without_calling_the_processor() {
    let calls = Arc::new(AtomicU32::new(0));
    let router = spawn_router(
        vec![("4", "us")],
        "default",
        vec![RegionSetup {
            name: "us",
            client: Arc::new(StubProcessor {
                delay: Duration::from_millis(1),
                response_code: ResponseCode::Approved,
                calls: calls.clone(),
            }),
            timeout: Duration::from_secs(1),
        }],
        vec![],
        Arc::new(RejectingScreen),
    )
    .await;

    let reply = router.send("0100", "4111111111111111", "000000005000", "000004").await;
    assert_eq!(reply.get(FieldId::ResponseCode), Some("59"));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0, "processor must not be called");

    let row = router.wait_for_audit_row("000004").await;
    assert!(!row.approved);

    router.shutdown();
}
