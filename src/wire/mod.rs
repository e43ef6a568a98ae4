// SPDX-License-Identifier: AGPL-3.0-or-later

//! C1: length-prefixed fixed-field framing over a byte stream (`spec.md`
//! §4.1).

pub mod fields;
pub mod frame;

pub use fields::FieldId;
pub use frame::{Frame, read_frame, write_frame};
