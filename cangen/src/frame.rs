/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Wire-ready classic CAN frame.

use std::fmt;

use crate::catalog::codec::MAX_PAYLOAD_BYTES;

/// One classic CAN frame as produced by the frame assembler.
///
/// `data` is always 8 bytes; only the first `len` bytes are put on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanFrame {
    /// 11-bit or 29-bit identifier (no flag bits).
    pub id: u32,
    pub extended: bool,
    /// Data length code, `0..=8`.
    pub len: u8,
    pub data: [u8; MAX_PAYLOAD_BYTES],
}

impl CanFrame {
    /// The bytes actually transmitted.
    pub fn payload(&self) -> &[u8] {
        let len = usize::from(self.len).min(MAX_PAYLOAD_BYTES);
        &self.data[..len]
    }
}

/// candump-style `ID#DATA`, e.g. `123#0A0B` or `00000400#FF`.
impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "{:08X}#", self.id)?;
        } else {
            write!(f, "{:03X}#", self.id)?;
        }
        for b in self.payload() {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}
