// SPDX-License-Identifier: AGPL-3.0-or-later

//! C3: the protocol translation boundary (`spec.md` §4.3). Stateless, no
//! I/O — a pure mapping between the wire `Frame` and the internal
//! request/response records.

use crate::{
    error::RouterError,
    model::{InternalRequest, InternalResponse},
    wire::{FieldId, Frame},
};

/// `spec.md` §6: PAN field width is 19 characters; PANs are 12-19 digits.
/// Short PANs are right-padded with trailing spaces to fill the field —
/// padding with digits would change the number the field denotes, so a
/// non-digit filler is the only safe choice for a fixed-width numeric
/// field that must sometimes hold a shorter value.
const PAN_FIELD_WIDTH: usize = 19;

fn pad_pan(pan: &str) -> String {
    let mut padded = pan.to_string();
    padded.push_str(&" ".repeat(PAN_FIELD_WIDTH.saturating_sub(pan.len())));
    padded
}

fn unpad_pan(field: &str) -> String {
    field.trim_end().to_string()
}

/// Extracts fields `0, 2, 4, 7, 11` from an inbound frame into an
/// `InternalRequest`. Missing `2`, `4`, `7`, or `11` is a hard parse error
/// (`spec.md` §4.3); `region` is left empty for the dispatcher to fill in.
pub fn frame_to_request(frame: &Frame) -> Result<InternalRequest, RouterError> {
    let mti = frame.require(FieldId::Mti)?.to_string();
    let pan = unpad_pan(frame.require(FieldId::Pan)?);
    let amount = frame.require(FieldId::Amount)?.to_string();
    let transmission_time = frame.require(FieldId::TransmissionTime)?.to_string();
    let stan = frame.require(FieldId::Stan)?.to_string();

    Ok(InternalRequest {
        mti,
        pan,
        amount,
        transmission_time,
        stan,
        region: None,
    })
}

/// Builds a reply frame from `response` and `original_frame`.
///
/// Fields `2, 4, 7, 11` are copied from `original_frame`, *not* from
/// `response`, so that the reply is a byte-for-byte echo even if the
/// processor elided those fields on its own reply — this resolves the
/// "Translator field 4 echo on timeout" open question from `spec.md` §9:
/// every synthetic and processor-sourced reply echoes the original frame.
/// Field `39` carries the response code.
pub fn response_to_frame(response: &InternalResponse, original_frame: &Frame) -> Result<Frame, RouterError> {
    let mut out = Frame::new();
    out.set(FieldId::Mti, response.mti.clone());
    out.set(FieldId::Pan, original_frame.require(FieldId::Pan)?.to_string());
    out.set(FieldId::Amount, original_frame.require(FieldId::Amount)?.to_string());
    out.set(
        FieldId::TransmissionTime,
        original_frame.require(FieldId::TransmissionTime)?.to_string(),
    );
    out.set(FieldId::Stan, original_frame.require(FieldId::Stan)?.to_string());
    out.set(FieldId::ResponseCode, response.response_code.as_str().to_string());
    Ok(out)
}

/// Builds the wire frame for an outbound `InternalRequest` (used by the
/// test client and by integration tests driving the router as a peer).
pub fn request_to_frame(request: &InternalRequest) -> Result<Frame, RouterError> {
    let mut frame = Frame::new();
    frame.set(FieldId::Mti, request.mti.clone());
    frame.set(FieldId::Pan, pad_pan(&request.pan));
    frame.set(FieldId::Amount, request.amount.clone());
    frame.set(FieldId::TransmissionTime, request.transmission_time.clone());
    frame.set(FieldId::Stan, request.stan.clone());
    Ok(frame)
}
