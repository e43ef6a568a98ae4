// SPDX-License-Identifier: AGPL-3.0-or-later

//! C1: frame-oriented codec for the legacy envelope (`spec.md` §4.1).
//!
//! Framing is a 2-byte big-endian length prefix followed by that many
//! bytes of fixed-field ASCII payload. `Frame` holds the raw field map
//! decoded from one payload; `Translator` (see `crate::translate`) is the
//! only consumer that interprets those fields as an `InternalRequest` or
//! `InternalResponse`.

use std::collections::BTreeMap;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::RouterError,
    wire::fields::{self, FieldId},
};

/// One decoded legacy-protocol message: the set of recognized fields that
/// were present in the payload, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    fields: BTreeMap<&'static str, String>,
}

/// All fields this codec recognizes, in wire order. Field 39 only appears
/// on replies; encoding a request simply omits it.
const FIELD_ORDER: &[FieldId] = &[
    FieldId::Mti,
    FieldId::Pan,
    FieldId::Amount,
    FieldId::TransmissionTime,
    FieldId::Stan,
    FieldId::ResponseCode,
];

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FieldId) -> Option<&str> {
        self.fields.get(field.key()).map(String::as_str)
    }

    pub fn set(&mut self, field: FieldId, value: impl Into<String>) {
        self.fields.insert(field.key(), value.into());
    }

    pub fn require(&self, field: FieldId) -> Result<&str, RouterError> {
        self.get(field)
            .ok_or_else(|| RouterError::parse(format!("missing required field {}", field.key())))
    }

    /// Decodes one payload (the bytes *after* the 2-byte length prefix has
    /// already been stripped) into a `Frame`. A payload that does not
    /// parse all the fields it claims to carry is a parse fault — the
    /// caller decides, per `spec.md` §4.1, whether that closes the
    /// connection (it does not; only a short read mid-payload does).
    pub fn decode(payload: &[u8]) -> Result<Self, RouterError> {
        let mut frame = Frame::new();
        let mut offset = 0;
        // The envelope is the sum of whatever fields the sender included;
        // we greedily consume recognized fields in wire order until the
        // payload is exhausted. A payload that ends mid-field is a parse
        // fault (read_field surfaces it).
        for &field in FIELD_ORDER {
            if offset >= payload.len() {
                break;
            }
            let (value, next) = fields::read_field(payload, offset, field)?;
            frame.set(field, value);
            offset = next;
        }
        Ok(frame)
    }

    /// Encodes this frame's fields, in wire order, omitting any that were
    /// never set (`spec.md` §4.1: "Unknown fields are tolerated but
    /// ignored on decode and absent on encode").
    pub fn encode_payload(&self) -> Result<Vec<u8>, RouterError> {
        let mut out = Vec::with_capacity(64);
        for &field in FIELD_ORDER {
            if let Some(value) = self.get(field) {
                fields::write_field(&mut out, field, value)?;
            }
        }
        Ok(out)
    }
}

impl FieldId {
    const fn key(self) -> &'static str {
        match self {
            FieldId::Mti => "0",
            FieldId::Pan => "2",
            FieldId::Amount => "4",
            FieldId::TransmissionTime => "7",
            FieldId::Stan => "11",
            FieldId::ResponseCode => "39",
        }
    }
}

/// Reads exactly one length-prefixed frame from `stream`.
///
/// A short read before the 2-byte prefix is a normal connection close:
/// returns `Ok(None)`. A short read inside the payload, or a zero-length
/// payload, is a protocol fault and must close the connection (`spec.md`
/// §4.1): returns `Err(RouterError::StreamFault)`.
pub async fn read_frame<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Option<Frame>, RouterError> {
    let mut len_buf = [0u8; 2];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {},
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(RouterError::StreamFault(e)),
    }
    let len = u16::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Err(RouterError::StreamFault(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "zero-length payload",
        )));
    }
    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .await
        .map_err(RouterError::StreamFault)?;

    match Frame::decode(&payload) {
        Ok(frame) => Ok(Some(frame)),
        Err(parse_err) => {
            // A payload that fails to parse is still a complete frame at
            // the transport level; it is a per-message fault, not a
            // stream fault, and must not close the connection.
            Err(parse_err)
        },
    }
}

/// Writes `frame` to `stream` with its 2-byte big-endian length prefix.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    stream: &mut W,
    frame: &Frame,
) -> Result<(), RouterError> {
    let payload = frame.encode_payload()?;
    let len: u16 = payload
        .len()
        .try_into()
        .map_err(|_| RouterError::parse("encoded payload exceeds 64KiB frame limit"))?;
    stream
        .write_all(&len.to_be_bytes())
        .await
        .map_err(RouterError::StreamFault)?;
    stream
        .write_all(&payload)
        .await
        .map_err(RouterError::StreamFault)?;
    stream.flush().await.map_err(RouterError::StreamFault)?;
    Ok(())
}
