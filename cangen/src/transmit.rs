/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Transmission of assembled frames.
//!
//! A [`Transmitter`] is bound to exactly one interface, so the instance itself
//! plays the role of the interface handle.  Writes are fire-and-forget: the
//! orchestrator logs a failed write and moves on; the next tick simply tries
//! again.
//!
//! | Implementation | When |
//! |---|---|
//! | [`LogTransmitter`] | `--dry-run`, or built without the `socketcan` feature |
//! | `SocketCanTransmitter` | Linux raw CAN socket (`socketcan` feature) |

use thiserror::Error;
use tracing::info;

use crate::frame::CanFrame;

#[cfg(feature = "socketcan")]
pub use socket::SocketCanTransmitter;

/// A failed frame write.  Never fatal.
#[derive(Debug, Error)]
pub enum TransmitError {
    /// The underlying socket write failed.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The frame cannot be put on the bus as-is (e.g. an 11-bit id above
    /// `0x7FF`).
    #[error("frame {id:#x} rejected: {reason}")]
    FrameRejected { id: u32, reason: &'static str },
}

/// Writes frames to one CAN interface.
pub trait Transmitter: Send {
    /// Write `frame` and return the number of payload bytes sent.
    fn send(&mut self, frame: &CanFrame) -> Result<usize, TransmitError>;
}

// ── Dry run ───────────────────────────────────────────────────────────────────

/// Logs every frame in candump style instead of writing it to a socket.
#[derive(Debug)]
pub struct LogTransmitter {
    interface: String,
}

impl LogTransmitter {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }
}

impl Transmitter for LogTransmitter {
    fn send(&mut self, frame: &CanFrame) -> Result<usize, TransmitError> {
        info!("{}  {}", self.interface, frame);
        Ok(frame.payload().len())
    }
}

// ── SocketCAN ─────────────────────────────────────────────────────────────────

#[cfg(feature = "socketcan")]
mod socket {
    use std::io;

    use socketcan::{CanFrame as RawFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket, StandardId};
    use tracing::info;

    use super::{TransmitError, Transmitter};
    use crate::frame::CanFrame;

    /// Classic-CAN writer on a Linux raw CAN socket.
    pub struct SocketCanTransmitter {
        socket: CanSocket,
    }

    impl SocketCanTransmitter {
        /// Open a raw CAN socket bound to `interface` (e.g. `vcan0`).
        pub fn open(interface: &str) -> io::Result<Self> {
            let socket = CanSocket::open(interface).map_err(|e| io::Error::other(e.to_string()))?;
            info!(interface, "Opened CAN socket");
            Ok(Self { socket })
        }
    }

    impl Transmitter for SocketCanTransmitter {
        fn send(&mut self, frame: &CanFrame) -> Result<usize, TransmitError> {
            let id = if frame.extended {
                ExtendedId::new(frame.id).map(Id::Extended)
            } else {
                u16::try_from(frame.id)
                    .ok()
                    .and_then(StandardId::new)
                    .map(Id::Standard)
            }
            .ok_or(TransmitError::FrameRejected {
                id: frame.id,
                reason: "identifier out of range",
            })?;

            let raw = RawFrame::new(id, frame.payload()).ok_or(TransmitError::FrameRejected {
                id: frame.id,
                reason: "payload longer than 8 bytes",
            })?;

            self.socket.write_frame(&raw)?;
            Ok(frame.payload().len())
        }
    }
}

// ── Test support ──────────────────────────────────────────────────────────────
