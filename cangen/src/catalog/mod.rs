/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Message / signal catalog for one CAN interface.
//!
//! A [`Catalog`] is built once per interface from a DBC file before the first
//! tick and is read-only afterwards, so it is shared as `Arc<Catalog>`.
//!
//! The lookup + encode surface used by the frame assembler is small:
//!
//! | Operation | Method |
//! |---|---|
//! | resolve a message by name | [`Catalog::resolve_message`] |
//! | resolve a signal within a message | [`MessageDef::resolve_signal`] |
//! | physical value → raw bits | [`SignalDef::physical_to_raw`] |
//! | raw bits → frame buffer | [`SignalDef::encode_into`] |
//! | frame id / length | [`MessageDef::id`] / [`MessageDef::size`] |
//!
//! # Precondition
//! Signals of one message are expected to occupy disjoint bit ranges
//! (multiplexed signals excepted).  The encoder does not enforce this; use
//! [`MessageDef::overlapping_signals`] at load time to report violations.

pub mod codec;
pub mod dbc;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};

use codec::MAX_PAYLOAD_BYTES;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors raised while building a catalog from DBC text.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// A `BO_` / `SG_` statement could not be parsed.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A signal does not fit into its message or has an unusable scaling.
    #[error("signal '{signal}' in message '{message}': {reason}")]
    InvalidSignalLayout {
        message: String,
        signal: String,
        reason: String,
    },

    /// Two `BO_` statements declare the same message name.
    #[error("message '{name}' is declared more than once")]
    DuplicateMessage { name: String },
}

// ── Signal descriptor ─────────────────────────────────────────────────────────

/// Bit ordering of a signal inside the payload (`@1` / `@0` in DBC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Intel, `@1`.
    LittleEndian,
    /// Motorola, `@0`.
    BigEndian,
}

/// Role of a signal in a multiplexed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuxRole {
    #[default]
    Plain,
    /// The `M` signal selecting which multiplexed group is present.
    Multiplexor,
    /// Only present when the multiplexor equals the given value (`mN`).
    Multiplexed(u64),
}

/// Encode descriptor for one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDef {
    pub name: String,
    /// DBC start bit (LSB for Intel, MSB for Motorola).
    pub start_bit: u16,
    /// Field width in bits, `1..=64`.
    pub length: u8,
    pub byte_order: ByteOrder,
    pub signed: bool,
    pub factor: f64,
    pub offset: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub unit: String,
    pub mux: MuxRole,
}

impl SignalDef {
    /// Convert a physical value to the raw field value:
    /// `round((value - offset) / factor)`, saturated to the field width.
    pub fn physical_to_raw(&self, value: f64) -> u64 {
        let scaled = ((value - self.offset) / self.factor).round();
        codec::saturate(scaled, self.length, self.signed)
    }

    /// Write `raw` into this signal's bit range of `data`.
    pub fn encode_into(&self, raw: u64, data: &mut [u8; MAX_PAYLOAD_BYTES]) {
        codec::pack(data, self.byte_order, self.start_bit, self.length, raw);
    }

    /// Frame bit positions this signal occupies in a `size`-byte payload.
    pub fn bit_positions(&self, size: u8) -> Option<Vec<u16>> {
        codec::bit_positions(self.byte_order, self.start_bit, self.length, size)
    }

    /// Two signals can share bits only if they belong to different
    /// multiplexed groups.
    fn may_overlap_with(&self, other: &SignalDef) -> bool {
        matches!(
            (self.mux, other.mux),
            (MuxRole::Multiplexed(a), MuxRole::Multiplexed(b)) if a != b
        )
    }
}

// ── Message descriptor ────────────────────────────────────────────────────────

/// Encode descriptor for one message (`BO_`).
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDef {
    pub name: String,
    /// CAN identifier with the DBC extended flag (bit 31) stripped.
    pub id: u32,
    /// `true` for 29-bit identifiers.
    pub extended: bool,
    /// Payload length in bytes (DLC).
    pub size: u8,
    pub transmitter: String,
    pub signals: Vec<SignalDef>,
}

impl MessageDef {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn resolve_signal(&self, name: &str) -> Option<&SignalDef> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Pairs of signal names whose bit ranges intersect.
    ///
    /// Signals in different multiplexed groups are allowed to share bits and
    /// are not reported.
    pub fn overlapping_signals(&self) -> Vec<(&str, &str)> {
        let masks: Vec<u64> = self
            .signals
            .iter()
            .map(|s| {
                s.bit_positions(self.size)
                    .unwrap_or_default()
                    .into_iter()
                    .fold(0u64, |m, p| m | (1u64 << p))
            })
            .collect();

        let mut out = Vec::new();
        for (i, a) in self.signals.iter().enumerate() {
            for (j, b) in self.signals.iter().enumerate().skip(i + 1) {
                if masks[i] & masks[j] != 0 && !a.may_overlap_with(b) {
                    out.push((a.name.as_str(), b.name.as_str()));
                }
            }
        }
        out
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// All message descriptors of one interface, indexed by name and by id.
#[derive(Debug, Default)]
pub struct Catalog {
    messages: BTreeMap<String, MessageDef>,
    by_id: HashMap<(u32, bool), String>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from messages that have already been validated.
    ///
    /// # Errors
    /// [`CatalogError::DuplicateMessage`] if two messages share a name.
    pub fn from_messages(messages: impl IntoIterator<Item = MessageDef>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for msg in messages {
            if catalog.messages.contains_key(&msg.name) {
                return Err(CatalogError::DuplicateMessage { name: msg.name });
            }
            catalog.by_id.insert((msg.id, msg.extended), msg.name.clone());
            catalog.messages.insert(msg.name.clone(), msg);
        }
        Ok(catalog)
    }

    /// Parses DBC text.  See [`dbc`] for the supported subset.
    pub fn from_dbc_str(text: &str) -> Result<Self, CatalogError> {
        Self::from_messages(dbc::parse(text)?)
    }

    /// Reads and parses the DBC file at `path`, logging a summary and any
    /// overlapping signal layouts.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid DBC.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading DBC catalog from: {}", path.display());

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open DBC file: {}", path.display()))?;
        let catalog = Self::from_dbc_str(&text)
            .with_context(|| format!("Failed to parse DBC file: {}", path.display()))?;

        for msg in catalog.messages.values() {
            debug!(
                "  Message: {} | id: {:#x} | size: {} | tx: {} | signals: {}",
                msg.name,
                msg.id,
                msg.size,
                msg.transmitter,
                msg.signals.len()
            );
            for (a, b) in msg.overlapping_signals() {
                warn!(msg = %msg.name, a, b, "Signals share bits; encoded values will clobber each other");
            }
        }

        info!(
            "Successfully loaded {} message(s) from {}",
            catalog.messages.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn resolve_message(&self, name: &str) -> Option<&MessageDef> {
        self.messages.get(name)
    }

    /// Looks up a message by identifier.  Standard and extended frames with
    /// the same numeric id are distinct messages.
    pub fn message_by_id(&self, id: u32, extended: bool) -> Option<&MessageDef> {
        self.by_id.get(&(id, extended)).and_then(|name| self.messages.get(name))
    }

    /// All messages in name order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageDef> {
        self.messages.values()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENGINE_DBC: &str = r#"
VERSION ""

BU_: ECU DBG

BO_ 256 Engine: 8 ECU
 SG_ Rpm : 0|16@1+ (0.25,0) [0|16383.75] "rpm" DBG
 SG_ Temp : 16|8@1- (1,-40) [-40|87] "degC" DBG
 SG_ Gear : 31|4@0+ (1,0) [0|15] "" DBG

BO_ 2147484672 Status: 2 ECU
 SG_ Mode M : 0|4@1+ (1,0) [0|15] "" DBG
 SG_ A m0 : 4|4@1+ (1,0) [0|15] "" DBG
 SG_ B m1 : 4|4@1+ (1,0) [0|15] "" DBG
"#;

    fn engine() -> Catalog {
        Catalog::from_dbc_str(ENGINE_DBC).unwrap()
    }

    #[test]
    fn resolves_messages_by_name_and_id() {
        let cat = engine();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.resolve_message("Engine").unwrap().id(), 0x100);
        let status = cat.message_by_id(0x400, true).unwrap();
        assert_eq!(status.name, "Status");
        assert!(status.extended);
        assert!(cat.message_by_id(0x400, false).is_none());
        assert!(cat.resolve_message("Nope").is_none());
    }

    #[test]
    fn standard_and_extended_ids_do_not_collide() {
        let dbc = "BO_ 256 Std: 1 ECU\nBO_ 2147483904 Ext: 1 ECU\n";
        let cat = Catalog::from_dbc_str(dbc).unwrap();
        assert_eq!(cat.message_by_id(0x100, false).unwrap().name, "Std");
        assert_eq!(cat.message_by_id(0x100, true).unwrap().name, "Ext");
    }

    #[test]
    fn physical_to_raw_applies_factor_and_offset() {
        let cat = engine();
        let msg = cat.resolve_message("Engine").unwrap();
        let rpm = msg.resolve_signal("Rpm").unwrap();
        assert_eq!(rpm.physical_to_raw(1000.0), 4000);
        let temp = msg.resolve_signal("Temp").unwrap();
        // -40 offset: 20 °C → raw 60
        assert_eq!(temp.physical_to_raw(20.0), 60);
        // Below the signed range saturates at -128.
        assert_eq!(temp.physical_to_raw(-1000.0), 0x80);
    }

    #[test]
    fn encode_into_places_each_signal() {
        let cat = engine();
        let msg = cat.resolve_message("Engine").unwrap();
        let mut data = [0u8; 8];
        for (name, value) in [("Rpm", 1000.0), ("Temp", 20.0), ("Gear", 3.0)] {
            let sig = msg.resolve_signal(name).unwrap();
            sig.encode_into(sig.physical_to_raw(value), &mut data);
        }
        // Rpm 4000 = 0x0FA0 little endian, Temp 60 = 0x3C, Gear 3 in the
        // high nibble of byte 3 (Motorola, MSB at bit 31).
        assert_eq!(data, [0xA0, 0x0F, 0x3C, 0x30, 0, 0, 0, 0]);
    }

    #[test]
    fn overlap_check_ignores_distinct_mux_groups() {
        let cat = engine();
        assert!(cat.resolve_message("Status").unwrap().overlapping_signals().is_empty());
        assert!(cat.resolve_message("Engine").unwrap().overlapping_signals().is_empty());
    }

    #[test]
    fn overlap_check_reports_clashing_signals() {
        let dbc = "BO_ 1 M: 1 X\n SG_ A : 0|6@1+ (1,0) [0|0] \"\" X\n SG_ B : 4|4@1+ (1,0) [0|0] \"\" X\n";
        let cat = Catalog::from_dbc_str(dbc).unwrap();
        assert_eq!(cat.resolve_message("M").unwrap().overlapping_signals(), vec![("A", "B")]);
    }

    #[test]
    fn duplicate_message_name_is_rejected() {
        let dbc = "BO_ 1 M: 1 X\nBO_ 2 M: 1 X\n";
        assert_eq!(
            Catalog::from_dbc_str(dbc).unwrap_err(),
            CatalogError::DuplicateMessage { name: "M".into() }
        );
    }

    #[test]
    fn load_from_file_reads_dbc() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(ENGINE_DBC.as_bytes()).unwrap();
        let cat = Catalog::load_from_file(f.path()).unwrap();
        assert_eq!(cat.messages().count(), 2);
    }

    #[test]
    fn load_from_missing_file_fails() {
        assert!(Catalog::load_from_file(Path::new("/nonexistent/x.dbc")).is_err());
    }
}
