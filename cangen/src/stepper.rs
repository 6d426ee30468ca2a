/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Stepper: advances every signal in the [`WaveformStore`] to one global tick.
//!
//! The per-signal rule lives in [`SignalWave::step`](crate::wave::SignalWave::step);
//! this module applies it across the whole store and summarises the result.
//! There is no I/O here and nothing can fail.

use crate::store::WaveformStore;
use crate::wave::StepOutcome;

/// Counts from one [`step`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    /// Signals visited.
    pub stepped: usize,
    /// Signals whose tick matched a keyframe (including downgrades).
    pub keyframes_hit: usize,
    /// `Linear` signals that reached their last keyframe this tick.
    pub downgraded: usize,
}

/// Step every signal in `store` to `tick`.
///
/// Callers must pass each tick exactly once, in increasing order.
pub fn step(store: &mut WaveformStore, tick: u64) -> StepSummary {
    let mut summary = StepSummary::default();

    for wave in store.signals_mut() {
        summary.stepped += 1;
        match wave.step(tick) {
            StepOutcome::Advanced => {}
            StepOutcome::Keyframe => summary.keyframes_hit += 1,
            StepOutcome::Downgraded => {
                summary.keyframes_hit += 1;
                summary.downgraded += 1;
            }
        }
    }

    summary
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::{SignalWave, Transition};

    fn wave(points: &[(u64, f64)], transition: Transition) -> SignalWave {
        SignalWave::new(points.iter().copied().collect(), transition, 0, 0.0)
    }

    #[test]
    fn steps_every_signal_on_every_interface() {
        let mut store = WaveformStore::new();
        store.insert("vcan0", "A", "x", wave(&[(0, 1.0)], Transition::Static));
        store.insert("vcan1", "B", "y", wave(&[(0, 0.0), (2, 4.0)], Transition::Linear));
        store.insert("vcan1", "B", "z", SignalWave::default());

        let s = step(&mut store, 0);
        assert_eq!(
            s,
            StepSummary {
                stepped: 3,
                keyframes_hit: 2,
                downgraded: 0
            }
        );

        step(&mut store, 1);
        assert_eq!(store.get("vcan1", "B", "y").unwrap().current_value, 2.0);

        let s = step(&mut store, 2);
        assert_eq!(s.downgraded, 1);
        assert_eq!(store.get("vcan0", "A", "x").unwrap().current_value, 1.0);
        assert_eq!(store.get("vcan1", "B", "y").unwrap().current_value, 4.0);
    }

    #[test]
    fn empty_store_steps_nothing() {
        let mut store = WaveformStore::new();
        assert_eq!(step(&mut store, 0), StepSummary::default());
    }
}
