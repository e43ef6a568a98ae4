// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-connection read/dispatch/write loop (`spec.md` §4.2).

use std::{sync::Arc, time::Duration};

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    translate,
    wire::{read_frame, write_frame},
    workflow::Workflow,
};

#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Per-read idle deadline; a stuck socket is closed rather than held
    /// open indefinitely (`spec.md` §4.2).
    pub idle_deadline: Duration,
    /// Bound on draining an in-flight message during shutdown.
    pub drain_deadline: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            idle_deadline: Duration::from_secs(30),
            drain_deadline: Duration::from_secs(15),
        }
    }
}

/// Owns one accepted socket for its lifetime. Reads frames sequentially
/// — the next frame is not read until the previous reply has been
/// written (`spec.md` §4.2: "strict FIFO within one connection"; §5:
/// "replies are delivered in the same order as their requests").
pub async fn run(mut stream: TcpStream, peer: std::net::SocketAddr, workflow: Arc<Workflow>, config: ConnectionConfig, shutdown: CancellationToken) {
    let span = info_span!("connection", %peer);
    async move {
        info!("connection accepted");
        loop {
            let frame = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("shutdown requested: draining then closing");
                    break;
                },
                result = tokio::time::timeout(config.idle_deadline, read_frame(&mut stream)) => result,
            };

            let frame = match frame {
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) => {
                    debug!("peer closed connection");
                    break;
                },
                Ok(Err(err)) if err.is_connection_fatal() => {
                    warn!(error = %err, "stream fault: closing connection");
                    break;
                },
                Ok(Err(parse_err)) => {
                    // Per-message parse fault: log and keep the connection open
                    // (`spec.md` §4.1).
                    warn!(error = %parse_err, "parse fault: dropping frame");
                    continue;
                },
                Err(_elapsed) => {
                    debug!("idle deadline exceeded: closing connection");
                    break;
                },
            };

            if let Err(err) = handle_frame(&mut stream, &frame, &workflow, &shutdown, config.drain_deadline).await {
                if err.is_connection_fatal() {
                    warn!(error = %err, "stream fault writing reply: closing connection");
                    break;
                }
                warn!(error = %err, "failed to translate reply");
            }
        }
        info!("connection closed");
    }
    .instrument(span)
    .await;
}

async fn handle_frame(
    stream: &mut TcpStream,
    frame: &crate::wire::Frame,
    workflow: &Workflow,
    shutdown: &CancellationToken,
    drain_deadline: Duration,
) -> Result<(), crate::error::RouterError> {
    let request = translate::frame_to_request(frame)?;
    // `Workflow::run` carries its own execution-timeout budget and always
    // resolves to a response, so no deadline applies while the connection is
    // healthy. The drain deadline only starts counting once shutdown has
    // been requested, bounding how long a connection may hold up process
    // exit (`spec.md` §4.2: "open connections are marked for drain").
    let response = tokio::select! {
        response = workflow.run(request) => response,
        () = drain_on_shutdown(shutdown, drain_deadline) => return Ok(()),
    };
    let reply = translate::response_to_frame(&response, frame)?;
    write_frame(stream, &reply).await
}

async fn drain_on_shutdown(shutdown: &CancellationToken, drain_deadline: Duration) {
    shutdown.cancelled().await;
    tokio::time::sleep(drain_deadline).await;
}
