/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Frame assembler: one [`CanFrame`] per configured message per tick.
//!
//! ```text
//!  MessageSignals ──► resolve_message ──► for each signal:
//!                                           resolve_signal
//!                                           physical_to_raw(current_value)
//!                                           encode_into(&mut data)
//!                     ──► id / len from the message descriptor ──► CanFrame
//! ```
//!
//! Every signal writes into the same zeroed 8-byte buffer, so the result does
//! not depend on signal order as long as the catalog's bit ranges are
//! disjoint.

pub mod error;

pub use error::EncodeError;

use tracing::trace;

use crate::catalog::codec::MAX_PAYLOAD_BYTES;
use crate::catalog::Catalog;
use crate::frame::CanFrame;
use crate::store::MessageSignals;

/// Build the frame for `message` from the current values in `signals`.
///
/// Pure: reads the catalog and the signal states, transmits nothing.
///
/// # Errors
/// * [`EncodeError::UnknownMessage`] – `message` is not in `catalog`.
/// * [`EncodeError::UnknownSignal`] – one of `signals` is not in the message.
pub fn assemble(
    catalog: &Catalog,
    message: &str,
    signals: &MessageSignals,
) -> Result<CanFrame, EncodeError> {
    let msg = catalog
        .resolve_message(message)
        .ok_or_else(|| EncodeError::UnknownMessage {
            message: message.to_string(),
        })?;

    let mut data = [0u8; MAX_PAYLOAD_BYTES];

    for (name, wave) in signals {
        let sig = msg
            .resolve_signal(name)
            .ok_or_else(|| EncodeError::UnknownSignal {
                message: message.to_string(),
                signal: name.clone(),
            })?;

        let raw = sig.physical_to_raw(wave.current_value);
        sig.encode_into(raw, &mut data);
        trace!(msg = message, signal = %name, value = wave.current_value, raw, "encoded");
    }

    Ok(CanFrame {
        id: msg.id(),
        extended: msg.extended,
        len: msg.size(),
        data,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
