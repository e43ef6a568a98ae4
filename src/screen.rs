// SPDX-License-Identifier: AGPL-3.0-or-later

//! The pre-screen contract (`spec.md` §4.7 step 1, §9 "Dynamic
//! dispatch"). The fraud-screen policy engine itself is out of scope
//! (`spec.md` §1); this module specifies the `Analyze` capability
//! interface and a no-op implementation so the router can run without a
//! configured screen.

use async_trait::async_trait;

use crate::{error::RouterError, model::InternalRequest};

/// The screen's verdict on one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOutcome {
    Pass,
    Reject,
}

#[async_trait]
pub trait Screen: Send + Sync {
    async fn analyze(&self, request: &InternalRequest) -> Result<ScreenOutcome, RouterError>;
}

/// Always passes. Absence of a real screen is a valid configuration
/// (`spec.md` §9), not an error.
#[derive(Debug, Default)]
pub struct NoopScreen;

#[async_trait]
impl Screen for NoopScreen {
    async fn analyze(&self, _request: &InternalRequest) -> Result<ScreenOutcome, RouterError> {
        Ok(ScreenOutcome::Pass)
    }
}
