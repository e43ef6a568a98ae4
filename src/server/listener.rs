// SPDX-License-Identifier: AGPL-3.0-or-later

//! C2: the connection server. Accepts long-lived TCP connections and
//! spawns one lightweight task per connection (`spec.md` §4.2, §5).

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{server::connection, workflow::Workflow};

pub use connection::ConnectionConfig;

/// Accepts until `shutdown` fires, then stops accepting and lets
/// already-spawned connection tasks drain under their own deadline
/// (`spec.md` §4.2: "the listener stops accepting; open connections are
/// marked for drain").
pub async fn serve(
    listener: TcpListener,
    workflow: Arc<Workflow>,
    config: ConnectionConfig,
    shutdown: CancellationToken,
) {
    let mut connections = tokio::task::JoinSet::new();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("listener shutting down: draining open connections");
                break;
            },
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let workflow = workflow.clone();
                    let shutdown = shutdown.clone();
                    connections.spawn(connection::run(stream, peer, workflow, config, shutdown));
                },
                Err(err) => {
                    warn!(error = %err, "accept failed");
                },
            },
        }
    }
    while connections.join_next().await.is_some() {}
}
