// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the monitor.
//!
//! Failures are grouped by where they originate: configuration validation,
//! the fieldbus transport, and decoding of a raw reading. None of them is
//! fatal to a running monitor; the poll loop turns each one into a status
//! for the cycle in which it happened.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration was rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The transport failed to connect, read, or close.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A reading arrived but could not be turned into a point value.
    #[error("reading error: {0}")]
    Reading(#[from] ReadingError),

    /// No session is open, so no read was issued.
    #[error("PLC is not connected")]
    NotConnected,

    /// The connection manager has been shut down.
    #[error("monitor is shut down")]
    ShutDown,
}

impl Error {
    /// Returns `true` if this error means the session should be discarded.
    ///
    /// Timeouts and read faults on an open session usually indicate a dead
    /// connection rather than a transient glitch.
    #[must_use]
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::Timeout(_) | TransportError::ReadFault(_))
        )
    }
}

/// Errors produced by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Opening a session failed (unreachable, refused, unit mismatch).
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// The read did not complete within the configured timeout.
    #[error("read timed out after {0} ms")]
    Timeout(u64),

    /// The read failed on an open session.
    #[error("read failed: {0}")]
    ReadFault(String),

    /// Closing a session failed.
    #[error("close failed: {0}")]
    CloseFailed(String),

    /// The transport cannot address this kind of point.
    #[error("unsupported point address: {0}")]
    UnsupportedAddress(String),

    /// The endpoint host or port could not be resolved.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Errors found while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A duration setting was zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// The endpoint host was empty.
    #[error("host must not be empty")]
    EmptyHost,

    /// The poll interval is shorter than the read timeout.
    #[error(
        "poll interval ({interval_ms} ms) is shorter than read timeout ({timeout_ms} ms); \
         check that the interval is given in milliseconds"
    )]
    IntervalShorterThanTimeout {
        /// Configured poll interval in milliseconds.
        interval_ms: u128,
        /// Configured read timeout in milliseconds.
        timeout_ms: u128,
    },

    /// The config file could not be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for a monitor configuration.
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while normalizing a raw reading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadingError {
    /// The transport returned no data.
    #[error("reading contained no data")]
    Empty,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
