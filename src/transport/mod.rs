// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fieldbus transports.
//!
//! The monitor core never talks to a fieldbus client directly. It is written
//! against the [`Transport`] capability: open a session, read one point,
//! close the session. Each fieldbus provides its own implementation.
//!
//! # Transports
//!
//! - [`ModbusTcpTransport`]: discrete inputs and coils over Modbus TCP
//!   (requires the `modbus` feature)
//! - [`ScriptedTransport`](crate::testing::ScriptedTransport): scripted
//!   outcomes for tests
//!
//! Tag-addressed fieldbuses (EtherNet/IP) implement the same trait and
//! accept [`PointAddress::Tag`].

#[cfg(feature = "modbus")]
mod modbus;

#[cfg(feature = "modbus")]
pub use modbus::ModbusTcpTransport;

use std::future::Future;
use std::time::Duration;

use crate::config::EndpointConfig;
use crate::error::TransportError;
use crate::types::{PointAddress, PointValue};

/// A reading as returned by a transport, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReading {
    /// Bit values (discrete inputs, coils). The point is the first bit.
    Bits(Vec<bool>),
    /// Register words. The point is the first word.
    Registers(Vec<u16>),
    /// A value the transport has already typed (tag reads).
    Value(PointValue),
}

impl From<bool> for RawReading {
    fn from(value: bool) -> Self {
        Self::Bits(vec![value])
    }
}

/// The capability the monitor needs from a fieldbus client.
///
/// Sessions are owned exclusively by the
/// [`ConnectionManager`](crate::connection::ConnectionManager); the monitor
/// never issues two calls against the same session concurrently, so
/// implementations need not multiplex requests.
pub trait Transport: Send + Sync + 'static {
    /// The live session handle.
    type Session: Send + 'static;

    /// Opens a session to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectFailed`] or
    /// [`TransportError::InvalidEndpoint`] if no session could be opened.
    fn open(
        &self,
        config: &EndpointConfig,
    ) -> impl Future<Output = Result<Self::Session, TransportError>> + Send;

    /// Closes a session.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CloseFailed`]; callers discard the session
    /// either way.
    fn close(&self, session: Self::Session)
    -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reads a single point.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] if the read exceeds `timeout`,
    /// [`TransportError::ReadFault`] if the device or link failed, and
    /// [`TransportError::UnsupportedAddress`] if this transport cannot
    /// address the point.
    fn read_point(
        &self,
        session: &mut Self::Session,
        address: &PointAddress,
        timeout: Duration,
    ) -> impl Future<Output = Result<RawReading, TransportError>> + Send;
}

/// Converts a timeout to whole milliseconds for error reporting.
pub(crate) fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
