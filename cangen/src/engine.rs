/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-tick orchestration and the periodic run loop.
//!
//! [`Simulator`] is the explicit simulation context: it owns the waveform
//! store, the global clock, and one catalog + transmitter pair per interface.
//! [`Simulator::tick`] performs exactly one pass:
//!
//! ```text
//!  Idle ─► Stepping ─► for each interface, for each message:
//!                        Assembling ─► Transmitting
//!       ◄─ clock += 1 ◄─┘
//! ```
//!
//! Failures are per message: an [`EncodeError`] or a failed write is logged
//! and the pass moves on to the next message.  The clock increments exactly
//! once per pass, whatever happened inside it.
//!
//! [`run`] drives `tick()` from a tokio interval.  The tick body is synchronous
//! and `tick()` takes `&mut self`, so a pass can never overlap the next one.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::assembler::{assemble, EncodeError};
use crate::catalog::Catalog;
use crate::stepper;
use crate::store::WaveformStore;
use crate::transmit::Transmitter;

// ── Channel ───────────────────────────────────────────────────────────────────

/// Per-interface collaborators: the read-only catalog and the frame writer.
pub struct Channel {
    pub catalog: Arc<Catalog>,
    pub transmitter: Box<dyn Transmitter>,
}

// ── Reports ───────────────────────────────────────────────────────────────────

/// Outcome of one [`Simulator::tick`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Global tick that was evaluated.
    pub tick: u64,
    pub frames_sent: usize,
    /// Messages skipped because a name did not resolve in the catalog.
    pub encode_failures: usize,
    /// Frames assembled but not written.
    pub send_failures: usize,
    /// Interfaces with signals but no channel.
    pub skipped_interfaces: usize,
}

/// Totals over a whole [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub frames_sent: u64,
    pub encode_failures: u64,
    pub send_failures: u64,
}

impl RunSummary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.frames_sent += report.frames_sent as u64;
        self.encode_failures += report.encode_failures as u64;
        self.send_failures += report.send_failures as u64;
    }
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// Simulation context: waveform state, global clock and interface channels.
pub struct Simulator {
    store: WaveformStore,
    clock: u64,
    channels: BTreeMap<String, Channel>,
}

impl Simulator {
    /// Creates a simulator at tick 0 with no interfaces attached.
    pub fn new(store: WaveformStore) -> Self {
        let noisy = store
            .interfaces()
            .flat_map(|iface| store.for_each(iface))
            .filter(|(_, _, w)| w.noise != 0)
            .count();
        if noisy > 0 {
            // TODO: define a noise model (distribution, seeding) before applying signalNoise.
            info!(signals = noisy, "signalNoise is configured but not applied to encoded values");
        }

        Self {
            store,
            clock: 0,
            channels: BTreeMap::new(),
        }
    }

    /// Attach the catalog and transmitter for `interface`.  Replaces any
    /// previous channel of the same name.
    pub fn add_interface(
        &mut self,
        interface: impl Into<String>,
        catalog: Arc<Catalog>,
        transmitter: Box<dyn Transmitter>,
    ) {
        self.channels.insert(
            interface.into(),
            Channel {
                catalog,
                transmitter,
            },
        );
    }

    /// The next tick to be evaluated (number of completed passes).
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn store(&self) -> &WaveformStore {
        &self.store
    }

    /// Every configured name that will fail to encode, paired with its
    /// interface.  Logged once at startup; the failures still recur every
    /// tick.
    pub fn unresolved(&self) -> Vec<(String, EncodeError)> {
        let mut out = Vec::new();
        for (interface, channel) in &self.channels {
            for (message, signals) in self.store.messages(interface) {
                let Some(msg) = channel.catalog.resolve_message(message) else {
                    out.push((
                        interface.clone(),
                        EncodeError::UnknownMessage {
                            message: message.to_string(),
                        },
                    ));
                    continue;
                };
                for signal in signals.keys() {
                    if msg.resolve_signal(signal).is_none() {
                        out.push((
                            interface.clone(),
                            EncodeError::UnknownSignal {
                                message: message.to_string(),
                                signal: signal.clone(),
                            },
                        ));
                    }
                }
            }
        }
        out
    }

    /// Perform one full pass for the current tick, then advance the clock.
    pub fn tick(&mut self) -> TickReport {
        let tick = self.clock;
        let mut report = TickReport {
            tick,
            ..Default::default()
        };

        let summary = stepper::step(&mut self.store, tick);
        debug!(
            tick,
            stepped = summary.stepped,
            keyframes = summary.keyframes_hit,
            downgraded = summary.downgraded,
            "stepped"
        );

        for interface in self.store.interfaces() {
            let Some(channel) = self.channels.get_mut(interface) else {
                warn!(tick, interface, "No channel for interface; skipping");
                report.skipped_interfaces += 1;
                continue;
            };

            for (message, signals) in self.store.messages(interface) {
                let frame = match assemble(&channel.catalog, message, signals) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(tick, interface, msg = message, error = %e, "Skipping message this tick");
                        report.encode_failures += 1;
                        continue;
                    }
                };

                match channel.transmitter.send(&frame) {
                    Ok(bytes) => {
                        trace!(tick, interface, msg = message, %frame, bytes, "sent");
                        report.frames_sent += 1;
                    }
                    Err(e) => {
                        warn!(tick, interface, msg = message, error = %e, "Frame write failed");
                        report.send_failures += 1;
                    }
                }
            }
        }

        self.clock += 1;
        report
    }
}

// ── Run loop ──────────────────────────────────────────────────────────────────

/// Call [`Simulator::tick`] once per `period` until `max_ticks` passes have
/// run or `shutdown` resolves, whichever comes first.
///
/// The first pass fires one period after the call.  If a pass overruns, the
/// following ticks are delayed rather than fired back-to-back, so every fire
/// still evaluates exactly one tick.
pub async fn run<F>(
    sim: &mut Simulator,
    period: Duration,
    max_ticks: Option<u64>,
    shutdown: F,
) -> RunSummary
where
    F: Future<Output = ()>,
{
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut totals = RunSummary::default();
    info!(?period, max_ticks, "Started tick timer");

    loop {
        if max_ticks.is_some_and(|n| totals.ticks >= n) {
            info!(ticks = totals.ticks, "Tick limit reached");
            break;
        }

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(ticks = totals.ticks, "Shutdown requested");
                break;
            }
            _ = interval.tick() => {
                let report = sim.tick();
                totals.record(&report);
            }
        }
    }

    totals
}

// ── Tests ─────────────────────────────────────────────────────────────────────
