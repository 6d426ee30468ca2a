/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Waveform store: every configured signal, indexed by
//! interface → message → signal.
//!
//! The nested layout means "group signals by owning message" is just a walk
//! over the middle level, which is exactly what the frame assembler needs.
//! All three levels are `BTreeMap` so iteration order is deterministic.

use std::collections::BTreeMap;

use crate::wave::SignalWave;

/// signal name → state, for one message.
pub type MessageSignals = BTreeMap<String, SignalWave>;

/// message name → signals, for one interface.
type InterfaceMessages = BTreeMap<String, MessageSignals>;

/// Owns the evaluated state of every configured signal.
#[derive(Debug, Clone, Default)]
pub struct WaveformStore {
    interfaces: BTreeMap<String, InterfaceMessages>,
}

impl WaveformStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for the triple, inserting a default (empty, `Static`,
    /// value `0.0`) wave if it does not exist yet.
    pub fn get_or_insert(&mut self, interface: &str, message: &str, signal: &str) -> &mut SignalWave {
        self.interfaces
            .entry(interface.to_string())
            .or_default()
            .entry(message.to_string())
            .or_default()
            .entry(signal.to_string())
            .or_default()
    }

    /// Stores `wave` for the triple and returns the state it replaced, if any.
    pub fn insert(
        &mut self,
        interface: &str,
        message: &str,
        signal: &str,
        wave: SignalWave,
    ) -> Option<SignalWave> {
        self.interfaces
            .entry(interface.to_string())
            .or_default()
            .entry(message.to_string())
            .or_default()
            .insert(signal.to_string(), wave)
    }

    pub fn get(&self, interface: &str, message: &str, signal: &str) -> Option<&SignalWave> {
        self.interfaces.get(interface)?.get(message)?.get(signal)
    }

    /// Iterates over every `(message, signal, state)` configured on `interface`.
    ///
    /// Yields nothing for an unknown interface.
    pub fn for_each<'a>(
        &'a self,
        interface: &str,
    ) -> impl Iterator<Item = (&'a str, &'a str, &'a SignalWave)> + 'a {
        self.messages(interface).flat_map(|(message, signals)| {
            signals
                .iter()
                .map(move |(signal, wave)| (message, signal.as_str(), wave))
        })
    }

    /// Iterates over the configured messages of `interface` with their signals.
    pub fn messages<'a>(
        &'a self,
        interface: &str,
    ) -> impl Iterator<Item = (&'a str, &'a MessageSignals)> + 'a {
        self.interfaces
            .get(interface)
            .into_iter()
            .flat_map(|messages| messages.iter().map(|(m, s)| (m.as_str(), s)))
    }

    /// Names of all interfaces that carry at least one signal, ascending.
    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    /// Mutable access to every signal state in the store, across all
    /// interfaces.  Used by the stepper.
    pub fn signals_mut(&mut self) -> impl Iterator<Item = &mut SignalWave> {
        self.interfaces
            .values_mut()
            .flat_map(|messages| messages.values_mut())
            .flat_map(|signals| signals.values_mut())
    }

    /// Total number of configured signals.
    pub fn signal_count(&self) -> usize {
        self.interfaces
            .values()
            .flat_map(|messages| messages.values())
            .map(|signals| signals.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.signal_count() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
