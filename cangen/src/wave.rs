/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Waveform data model for a single generated signal.
//!
//! A waveform is a set of keyframes on the global tick axis plus a
//! [`Transition`] rule that says what happens between them:
//!
//! ```text
//!  value
//!    ▲        Static                        Linear
//!  20┤          ┌──────               20┤          ●──────  (downgraded)
//!    │          │                         │        ╱
//!  10┤ ●────────┘                     10┤   ╱
//!    │                                    │ ●
//!    └─┬───────┬──────► tick              └─┬───────┬──────► tick
//!      0       5                            0       5
//! ```
//!
//! # Ownership model
//! A [`SignalWave`] is owned by the [`WaveformStore`](crate::store::WaveformStore)
//! and mutated only by the stepper, once per tick.  Keyframes are immutable
//! after load; the only state that changes is `current_value`,
//! `current_slope`, and the one-way `Linear → Static` downgrade.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use serde::Deserialize;

// ── Transition kind ───────────────────────────────────────────────────────────

/// Interpolation rule applied between two keyframes.
///
/// Deserialises from the lowercase `transformType` strings used in the wave
/// files (`"static"`, `"linear"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Hold the value of the last keyframe until the next one is reached.
    #[default]
    Static,
    /// Ramp towards the next keyframe at a constant per-tick slope.
    Linear,
}

// ── Keyframes ─────────────────────────────────────────────────────────────────

/// Ordered `tick → target value` map.
///
/// `BTreeMap` so that iteration and "next key after `t`" lookups are always in
/// ascending tick order regardless of how the keyframes were declared.
pub type Keyframes = BTreeMap<u64, f64>;

/// What happened to a signal during one [`SignalWave::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No keyframe at this tick; value held or ramped.
    Advanced,
    /// The tick matched a keyframe and the value snapped to it.
    Keyframe,
    /// The tick matched the last keyframe of a `Linear` wave, which is now
    /// permanently `Static`.
    Downgraded,
}

// ── SignalWave ────────────────────────────────────────────────────────────────

/// Evaluated waveform state for one (interface, message, signal) triple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalWave {
    /// Waypoints on the global tick axis.  May be empty.
    pub keyframes: Keyframes,

    /// Current interpolation rule.  Starts as configured; a `Linear` wave
    /// becomes `Static` once its last keyframe is reached.
    pub transition: Transition,

    /// Physical value handed to the catalog encoder on every tick.
    pub current_value: f64,

    /// Per-tick increment while `transition == Linear`.
    pub current_slope: f64,

    /// Configured noise amplitude.  Carried through from the wave file but not
    /// applied to the encoded value.
    pub noise: i32,
}

impl SignalWave {
    /// Build a wave from its configured parts with `current_value` set to
    /// `initial_value`, which holds until the first keyframe is reached.
    pub fn new(keyframes: Keyframes, transition: Transition, noise: i32, initial_value: f64) -> Self {
        Self {
            keyframes,
            transition,
            current_value: initial_value,
            current_slope: 0.0,
            noise,
        }
    }

    /// Advance this signal to global tick `tick`.
    ///
    /// Must be called once per tick with strictly increasing `tick` values;
    /// the linear ramp is accumulated, not recomputed from the keyframes.
    pub fn step(&mut self, tick: u64) -> StepOutcome {
        let Some(&target) = self.keyframes.get(&tick) else {
            if self.transition == Transition::Linear {
                self.current_value += self.current_slope;
            }
            return StepOutcome::Advanced;
        };

        let mut outcome = StepOutcome::Keyframe;

        if self.transition == Transition::Linear {
            match self.keyframes.range((Excluded(tick), Unbounded)).next() {
                Some((&next_tick, &next_value)) => {
                    self.current_slope = (next_value - target) / (next_tick - tick) as f64;
                }
                None => {
                    self.transition = Transition::Static;
                    outcome = StepOutcome::Downgraded;
                }
            }
        }

        self.current_value = target;
        outcome
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(points: &[(u64, f64)], transition: Transition) -> SignalWave {
        SignalWave::new(points.iter().copied().collect(), transition, 0, 0.0)
    }

    /// Step `w` through ticks `0..n` and collect the value after each step.
    fn run(w: &mut SignalWave, n: u64) -> Vec<f64> {
        (0..n)
            .map(|t| {
                w.step(t);
                w.current_value
            })
            .collect()
    }

    // ── Static ────────────────────────────────────────────────────────────────

    #[test]
    fn static_holds_until_next_keyframe() {
        let mut w = wave(&[(0, 10.0), (5, 20.0)], Transition::Static);
        let values = run(&mut w, 9);
        assert_eq!(values, vec![10.0, 10.0, 10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0]);
    }

    #[test]
    fn static_never_computes_a_slope() {
        let mut w = wave(&[(0, 0.0), (10, 100.0)], Transition::Static);
        run(&mut w, 5);
        assert_eq!(w.current_slope, 0.0);
        assert_eq!(w.current_value, 0.0);
    }

    // ── Linear ────────────────────────────────────────────────────────────────

    #[test]
    fn linear_ramps_then_downgrades_at_last_keyframe() {
        let mut w = wave(&[(0, 0.0), (4, 8.0)], Transition::Linear);
        let values = run(&mut w, 7);
        assert_eq!(values, vec![0.0, 2.0, 4.0, 6.0, 8.0, 8.0, 8.0]);
        assert_eq!(w.transition, Transition::Static);
    }

    #[test]
    fn linear_slope_is_recomputed_at_each_keyframe() {
        let mut w = wave(&[(0, 0.0), (2, 10.0), (4, 0.0)], Transition::Linear);
        let values = run(&mut w, 6);
        assert_eq!(values, vec![0.0, 5.0, 10.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn linear_snaps_to_keyframe_even_if_ramp_drifted() {
        // 1/3 per tick accumulates rounding error; the keyframe tick must
        // land exactly on the target.
        let mut w = wave(&[(0, 0.0), (3, 1.0), (6, 1.0)], Transition::Linear);
        run(&mut w, 4);
        assert_eq!(w.current_value, 1.0);
    }

    #[test]
    fn step_reports_keyframe_and_downgrade_outcomes() {
        let mut w = wave(&[(0, 0.0), (2, 4.0)], Transition::Linear);
        assert_eq!(w.step(0), StepOutcome::Keyframe);
        assert_eq!(w.step(1), StepOutcome::Advanced);
        assert_eq!(w.step(2), StepOutcome::Downgraded);
        assert_eq!(w.step(3), StepOutcome::Advanced);
    }

    // ── Downgrade permanence ──────────────────────────────────────────────────

    #[test]
    fn downgrade_is_permanent() {
        let mut w = wave(&[(0, 0.0), (2, 4.0)], Transition::Linear);
        run(&mut w, 3);
        assert_eq!(w.transition, Transition::Static);
        // A stale slope is still stored but must never be applied again.
        assert_eq!(w.current_slope, 2.0);
        for t in 3..100 {
            w.step(t);
            assert_eq!(w.current_value, 4.0, "value moved at tick {t}");
            assert_eq!(w.transition, Transition::Static);
        }
    }

    // ── Before first keyframe / empty ─────────────────────────────────────────

    #[test]
    fn value_holds_initial_value_before_first_keyframe() {
        let mut w = SignalWave::new([(3, 9.0)].into_iter().collect(), Transition::Linear, 0, 1.5);
        let values = run(&mut w, 5);
        assert_eq!(values, vec![1.5, 1.5, 1.5, 9.0, 9.0]);
    }

    #[test]
    fn empty_keyframes_never_change_value() {
        for transition in [Transition::Static, Transition::Linear] {
            let mut w = SignalWave::new(Keyframes::new(), transition, 0, 42.0);
            let values = run(&mut w, 50);
            assert!(values.iter().all(|&v| v == 42.0));
            assert_eq!(w.transition, transition);
        }
    }

    #[test]
    fn transition_deserialises_from_lowercase() {
        let t: Transition = serde_yaml::from_str("linear").unwrap();
        assert_eq!(t, Transition::Linear);
        let t: Transition = serde_yaml::from_str("static").unwrap();
        assert_eq!(t, Transition::Static);
        assert!(serde_yaml::from_str::<Transition>("cubic").is_err());
    }
}
