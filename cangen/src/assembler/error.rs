/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for frame assembly.
//!
//! Both variants describe static misconfiguration: a name in the wave file
//! that the interface's DBC catalog does not know.  The orchestrator logs the
//! error, skips that message for the current tick, and retries it unchanged
//! on the next one.

use thiserror::Error;

/// Why a configured message could not be turned into a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The message name does not resolve in the interface's catalog.
    #[error("message '{message}' not found in catalog")]
    UnknownMessage { message: String },

    /// A configured signal name does not exist in the resolved message.
    #[error("signal '{signal}' not found in message '{message}'")]
    UnknownSignal { message: String, signal: String },
}
