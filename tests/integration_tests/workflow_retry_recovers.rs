// SPDX-License-Identifier: AGPL-3.0-or-later

//! `spec.md` §8 end-to-end scenario 5: workflow retry recovers.

use std::{
    sync::{atomic::AtomicU32, Arc},
    time::Duration,
};

use authz_router::wire::FieldId;

use super::common::{spawn_router, FlakyProcessor, RegionSetup};

#[tokio::test]
async fn first_attempt_errors_second_succeeds_with_a_single_audit_row() {
    let calls = Arc::new(AtomicU32::new(0));
    let router = spawn_router(
        vec![("4", "us")],
        "default",
        vec![RegionSetup {
            name: "us",
            client: Arc::new(FlakyProcessor {
                fail_first: 1,
                calls: calls.clone(),
            }),
            timeout: Duration::from_secs(1),
        }],
        vec![],
        Arc::new(authz_router::screen::NoopScreen),
    )
    .await;

    let reply = router.send("0100", "4111111111111111", "000000005000", "000005").await;
    assert_eq!(reply.get(FieldId::ResponseCode), Some("00"));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2, "one failed attempt, one successful retry");

    let row = router.wait_for_audit_row("000005").await;
    assert!(row.approved);

    router.shutdown();
}
