/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure bit-packing helpers: raw-value saturation and Intel / Motorola
//! placement into an 8-byte CAN payload.
//!
//! These are free functions rather than methods so they can be used and tested
//! independently of the DBC types.
//!
//! Bit numbering follows the DBC convention: bit `n` lives in
//! `data[n / 8]` at position `n % 8` (LSB = 0).  For Motorola signals the
//! start bit names the **most** significant bit and the walk runs "sawtooth"
//! style: down within a byte, then to bit 7 of the following byte.

use super::ByteOrder;

/// Largest payload handled by the packer (classic CAN).
pub const MAX_PAYLOAD_BYTES: usize = 8;

/// Mask with the low `length` bits set.  `length >= 64` yields all ones.
pub fn bit_mask(length: u8) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

/// Clamp an already-scaled raw value into the range a `length`-bit field can
/// hold and return it as a `length`-bit pattern.
///
/// Signed fields use two's complement.  `NaN` maps to `0`.
pub fn saturate(value: f64, length: u8, signed: bool) -> u64 {
    if value.is_nan() || length == 0 {
        return 0;
    }
    let mask = bit_mask(length);

    // f64 → i128 casts saturate, so ±inf are handled by the clamp below.
    let v = value as i128;
    if signed {
        let half = 1i128 << (length - 1);
        (v.clamp(-half, half - 1) as u64) & mask
    } else {
        v.clamp(0, mask as i128) as u64
    }
}

/// Frame bit positions occupied by a field, indexed by raw bit significance
/// (element `k` is where raw bit `k` lands).
///
/// Returns `None` if any bit would fall outside a `size_bytes` payload.
pub fn bit_positions(order: ByteOrder, start_bit: u16, length: u8, size_bytes: u8) -> Option<Vec<u16>> {
    let limit = u16::from(size_bytes) * 8;
    let mut positions = Vec::with_capacity(length as usize);

    match order {
        ByteOrder::LittleEndian => {
            for k in 0..u16::from(length) {
                positions.push(start_bit.checked_add(k)?);
            }
        }
        ByteOrder::BigEndian => {
            // Walk MSB → LSB, then reverse so index == significance.
            let mut pos = start_bit;
            for k in 0..length {
                positions.push(pos);
                if k + 1 < length {
                    pos = if pos % 8 == 0 { pos + 15 } else { pos - 1 };
                }
            }
            positions.reverse();
        }
    }

    positions.iter().all(|&p| p < limit).then_some(positions)
}

/// Write the low `length` bits of `raw` into `data` at the given layout.
///
/// Only the field's own bits are touched.  The layout must already have been
/// validated with [`bit_positions`]; bits beyond the 8-byte buffer are ignored.
pub fn pack(data: &mut [u8; MAX_PAYLOAD_BYTES], order: ByteOrder, start_bit: u16, length: u8, raw: u64) {
    match order {
        ByteOrder::LittleEndian => {
            for k in 0..length {
                set_bit(data, start_bit + u16::from(k), (raw >> k) & 1 == 1);
            }
        }
        ByteOrder::BigEndian => {
            let mut pos = start_bit;
            for k in (0..length).rev() {
                set_bit(data, pos, (raw >> k) & 1 == 1);
                if k > 0 {
                    pos = if pos % 8 == 0 { pos + 15 } else { pos - 1 };
                }
            }
        }
    }
}

fn set_bit(data: &mut [u8; MAX_PAYLOAD_BYTES], pos: u16, on: bool) {
    let Some(byte) = data.get_mut(usize::from(pos / 8)) else {
        return;
    };
    let mask = 1u8 << (pos % 8);
    if on {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
