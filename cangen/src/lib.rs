/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! CanGen – synthetic CAN signal generator
//!
//! Drives named signals inside DBC messages through keyframed waveforms and
//! transmits the encoded frames at a fixed cadence.
//!
//! ```text
//! lib.rs
//! ├── config/      – YAML base config + wave files → WaveformStore
//! ├── wave         – keyframes, transition kinds, per-signal step rule
//! ├── store        – interface → message → signal state
//! ├── stepper      – advance every signal by one global tick
//! ├── catalog/     – DBC subset reader and bit packer
//! ├── assembler/   – one CAN frame per configured message
//! ├── frame        – wire-ready CAN frame
//! ├── transmit     – dry-run logger / SocketCAN writer
//! └── engine       – Simulator context, per-tick pass, tokio run loop
//! ```

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod frame;
pub mod stepper;
pub mod store;
pub mod transmit;
pub mod wave;
