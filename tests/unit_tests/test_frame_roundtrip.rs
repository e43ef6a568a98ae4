// SPDX-License-Identifier: AGPL-3.0-or-later

use authz_router::wire::{FieldId, Frame};

#[test]
fn encode_then_decode_is_identity_on_the_recognized_envelope() {
    let mut frame = Frame::new();
    frame.set(FieldId::Mti, "0100");
    frame.set(FieldId::Pan, "4111111111111111   ");
    frame.set(FieldId::Amount, "000000005000");
    frame.set(FieldId::TransmissionTime, "0728120000");
    frame.set(FieldId::Stan, "000001");

    let payload = frame.encode_payload().expect("encodes");
    let decoded = Frame::decode(&payload).expect("decodes");

    assert_eq!(decoded.get(FieldId::Mti), frame.get(FieldId::Mti));
    assert_eq!(decoded.get(FieldId::Pan), frame.get(FieldId::Pan));
    assert_eq!(decoded.get(FieldId::Amount), frame.get(FieldId::Amount));
    assert_eq!(decoded.get(FieldId::TransmissionTime), frame.get(FieldId::TransmissionTime));
    assert_eq!(decoded.get(FieldId::Stan), frame.get(FieldId::Stan));
}

#[test]
fn reply_frame_omits_unset_response_code() {
    let mut frame = Frame::new();
    frame.set(FieldId::Mti, "0100");
    let payload = frame.encode_payload().expect("encodes");
    // 4 bytes of mti only; decode should not find a response code.
    let decoded = Frame::decode(&payload).expect("decodes");
    assert_eq!(decoded.get(FieldId::ResponseCode), None);
}

#[test]
fn short_payload_is_a_parse_fault_not_a_panic() {
    let err = Frame::decode(b"01").unwrap_err();
    assert!(err.to_string().contains("parse fault"));
}
