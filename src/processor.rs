// SPDX-License-Identifier: AGPL-3.0-or-later

//! The processor-facing RPC contract (`spec.md` §6, "Internal RPC
//! contract"). The concrete regional processor is out of scope (`spec.md`
//! §1); this module specifies only the trait the dispatcher calls
//! through and owns no region-selection or health logic of its own.

use async_trait::async_trait;
use tokio::{net::TcpStream, sync::Mutex};

use crate::{
    error::RouterError,
    model::{AuditRecord, InternalRequest, InternalResponse},
    translate,
    wire::{read_frame, write_frame},
};

/// One region's authorization processor, reached over whatever transport
/// the deployment chooses (gRPC, a bespoke binary RPC, ...). Deadlines
/// are imposed by the caller (`dispatch::Dispatcher`), not by the
/// client, so the same client works under any timeout policy.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    async fn process_auth(&self, request: &InternalRequest) -> Result<InternalResponse, RouterError>;

    /// Out-of-band lookup of a previously processed transaction.
    /// Unused by the dispatch path; absence of a match is not an error.
    async fn get_transaction(&self, stan: &str) -> Result<Option<AuditRecord>, RouterError>;
}

/// A concrete client that reaches a regional processor over the same
/// length-prefixed fixed-field framing C1 speaks to acquirers
/// (`spec.md` §1 leaves the regional transport unspecified; reusing the
/// front-side codec avoids inventing a second wire format for a
/// collaborator this spec does not otherwise describe). One persistent
/// connection per region, serialized behind a mutex: a region processor
/// is assumed to handle one in-flight request at a time, matching the
/// strict-FIFO discipline C2 already uses on the front side.
pub struct TcpProcessorClient {
    stream: Mutex<TcpStream>,
}

impl TcpProcessorClient {
    pub async fn connect(host: &str, port: u16) -> Result<Self, RouterError> {
        let stream = TcpStream::connect((host, port)).await.map_err(RouterError::StreamFault)?;
        Ok(Self { stream: Mutex::new(stream) })
    }
}

#[async_trait]
impl ProcessorClient for TcpProcessorClient {
    async fn process_auth(&self, request: &InternalRequest) -> Result<InternalResponse, RouterError> {
        let mut stream = self.stream.lock().await;
        let frame = translate::request_to_frame(request)?;
        write_frame(&mut *stream, &frame).await?;
        let reply_frame = read_frame(&mut *stream)
            .await?
            .ok_or_else(|| RouterError::RegionError {
                region: request.region.clone().unwrap_or_default(),
                reason: "region processor closed the connection".to_string(),
            })?;
        let response_code = reply_frame
            .get(crate::wire::FieldId::ResponseCode)
            .map(crate::model::ResponseCode::from_wire)
            .unwrap_or(crate::model::ResponseCode::SystemMalfunction);
        Ok(InternalResponse {
            mti: reply_frame.require(crate::wire::FieldId::Mti)?.to_string(),
            pan: request.pan.clone(),
            amount: request.amount.clone(),
            transmission_time: request.transmission_time.clone(),
            stan: request.stan.clone(),
            response_code,
            processing_time_ms: 0,
        })
    }

    async fn get_transaction(&self, _stan: &str) -> Result<Option<AuditRecord>, RouterError> {
        Ok(None)
    }
}
