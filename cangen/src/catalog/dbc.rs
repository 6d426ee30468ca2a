/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Minimal DBC reader.
//!
//! Only the two statements needed to encode frames are understood:
//!
//! ```text
//! BO_ <id> <name>: <size> <transmitter>
//!  SG_ <name> [M|mN] : <start>|<length>@<order><sign> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>
//! ```
//!
//! Every other line (`VERSION`, `BU_`, `CM_`, `VAL_`, attributes, …) is
//! skipped.  Bit 31 of a `BO_` id marks an extended (29-bit) frame.
//!
//! A 0-byte `BO_` (such as `VECTOR__INDEPENDENT_SIG_MSG`) only parks signals
//! that are never transmitted; it and its signals are left out of the result.

use tracing::debug;

use super::{codec, ByteOrder, CatalogError, MessageDef, MuxRole, SignalDef};

const EXTENDED_FLAG: u32 = 0x8000_0000;
const EXTENDED_MASK: u32 = 0x1FFF_FFFF;

/// Parse DBC text into validated message descriptors, in file order.
pub fn parse(text: &str) -> Result<Vec<MessageDef>, CatalogError> {
    let mut messages: Vec<MessageDef> = Vec::new();
    // Inside a 0-byte container message.
    let mut parked = false;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        let Some((keyword, rest)) = line.split_once(char::is_whitespace) else {
            continue;
        };

        match keyword {
            "BO_" => {
                let msg = parse_message(line_no, rest)?;
                parked = msg.size == 0;
                if parked {
                    debug!(line = line_no, msg = %msg.name, "Skipping 0-byte message");
                } else {
                    messages.push(msg);
                }
            }
            "SG_" => {
                let signal = parse_signal(line_no, rest)?;
                if parked {
                    debug!(line = line_no, signal = %signal.name, "Skipping signal of 0-byte message");
                    continue;
                }
                let msg = messages
                    .last_mut()
                    .ok_or_else(|| syntax(line_no, "SG_ before any BO_"))?;
                validate_layout(msg, &signal)?;
                msg.signals.push(signal);
            }
            _ => {}
        }
    }

    Ok(messages)
}

fn syntax(line: usize, message: impl Into<String>) -> CatalogError {
    CatalogError::Syntax {
        line,
        message: message.into(),
    }
}

fn parse_num<T: std::str::FromStr>(line: usize, what: &str, s: &str) -> Result<T, CatalogError> {
    s.trim()
        .parse()
        .map_err(|_| syntax(line, format!("invalid {what}: '{}'", s.trim())))
}

/// Text between the first `open` and the following `close`.
fn between(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)? + open.len_utf8();
    let len = s[start..].find(close)?;
    Some(&s[start..start + len])
}

fn parse_message(line: usize, rest: &str) -> Result<MessageDef, CatalogError> {
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| syntax(line, "missing ':' in BO_"))?;

    let mut head = head.split_whitespace();
    let raw_id: u32 = parse_num(line, "message id", head.next().unwrap_or(""))?;
    let name = head
        .next()
        .ok_or_else(|| syntax(line, "missing message name"))?;

    let mut tail = tail.split_whitespace();
    let size: u8 = parse_num(line, "message size", tail.next().unwrap_or(""))?;
    if usize::from(size) > codec::MAX_PAYLOAD_BYTES {
        return Err(syntax(
            line,
            format!("message '{name}' size {size} exceeds {} bytes", codec::MAX_PAYLOAD_BYTES),
        ));
    }
    let transmitter = tail.next().unwrap_or("").to_string();

    Ok(MessageDef {
        name: name.to_string(),
        id: raw_id & EXTENDED_MASK,
        extended: raw_id & EXTENDED_FLAG != 0,
        size,
        transmitter,
        signals: Vec::new(),
    })
}

fn parse_signal(line: usize, rest: &str) -> Result<SignalDef, CatalogError> {
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| syntax(line, "missing ':' in SG_"))?;

    let mut head = head.split_whitespace();
    let name = head
        .next()
        .ok_or_else(|| syntax(line, "missing signal name"))?;
    let mux = match head.next() {
        None => MuxRole::Plain,
        Some("M") => MuxRole::Multiplexor,
        Some(tok) if tok.starts_with('m') => {
            // `m3M` (extended multiplexing) is treated as plain `m3`.
            MuxRole::Multiplexed(parse_num(line, "multiplex value", tok[1..].trim_end_matches('M'))?)
        }
        Some(tok) => return Err(syntax(line, format!("unexpected token '{tok}'"))),
    };

    // <start>|<length>@<order><sign>
    let tail = tail.trim_start();
    let layout = tail.split_whitespace().next().unwrap_or("");
    let (start, rest_layout) = layout
        .split_once('|')
        .ok_or_else(|| syntax(line, format!("bad bit layout '{layout}'")))?;
    let (length, order_sign) = rest_layout
        .split_once('@')
        .ok_or_else(|| syntax(line, format!("bad bit layout '{layout}'")))?;

    let mut flags = order_sign.chars();
    let byte_order = match flags.next() {
        Some('1') => ByteOrder::LittleEndian,
        Some('0') => ByteOrder::BigEndian,
        _ => return Err(syntax(line, format!("bad byte order in '{layout}'"))),
    };
    let signed = match flags.next() {
        Some('+') => false,
        Some('-') => true,
        _ => return Err(syntax(line, format!("bad sign in '{layout}'"))),
    };

    let scaling = between(tail, '(', ')').ok_or_else(|| syntax(line, "missing (factor,offset)"))?;
    let (factor, offset) = scaling
        .split_once(',')
        .ok_or_else(|| syntax(line, format!("bad scaling '({scaling})'")))?;

    let range = between(tail, '[', ']').ok_or_else(|| syntax(line, "missing [min|max]"))?;
    let (minimum, maximum) = range
        .split_once('|')
        .ok_or_else(|| syntax(line, format!("bad range '[{range}]'")))?;

    Ok(SignalDef {
        name: name.to_string(),
        start_bit: parse_num(line, "start bit", start)?,
        length: parse_num(line, "signal length", length)?,
        byte_order,
        signed,
        factor: parse_num(line, "factor", factor)?,
        offset: parse_num(line, "offset", offset)?,
        minimum: parse_num(line, "minimum", minimum)?,
        maximum: parse_num(line, "maximum", maximum)?,
        unit: between(tail, '"', '"').unwrap_or("").to_string(),
        mux,
    })
}

fn validate_layout(msg: &MessageDef, sig: &SignalDef) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidSignalLayout {
        message: msg.name.clone(),
        signal: sig.name.clone(),
        reason,
    };

    if sig.length == 0 || sig.length > 64 {
        return Err(invalid(format!("length {} is outside 1..=64", sig.length)));
    }
    if sig.factor == 0.0 || !sig.factor.is_finite() {
        return Err(invalid(format!("factor {} cannot be inverted", sig.factor)));
    }
    if sig.bit_positions(msg.size).is_none() {
        return Err(invalid(format!(
            "bits starting at {} (length {}) do not fit in {} byte(s)",
            sig.start_bit, sig.length, msg.size
        )));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
