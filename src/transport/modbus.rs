// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Modbus TCP transport.

use std::net::SocketAddr;
use std::time::Duration;

use tokio_modbus::client::{Context, tcp};
use tokio_modbus::prelude::*;

use crate::config::EndpointConfig;
use crate::error::TransportError;
use crate::transport::{RawReading, Transport, timeout_ms};
use crate::types::PointAddress;

/// Reads discrete inputs and coils over Modbus TCP.
///
/// The session is a `tokio-modbus` client context bound to the configured
/// unit id. Addresses are zero-based protocol offsets, so the register
/// documented as `1x24577` is [`PointAddress::DiscreteInput(24576)`].
///
/// Tag addresses are rejected with [`TransportError::UnsupportedAddress`].
///
/// # Examples
///
/// ```no_run
/// use plc_monitor::PointMonitor;
/// use plc_monitor::config::{EndpointConfig, MonitorConfig};
/// use plc_monitor::transport::ModbusTcpTransport;
/// use plc_monitor::types::PointAddress;
///
/// # async fn example() -> plc_monitor::Result<()> {
/// let config = MonitorConfig::new(
///     EndpointConfig::new("192.168.29.1").with_unit_id(25),
///     PointAddress::DiscreteInput(24576),
/// );
/// let monitor = PointMonitor::new(ModbusTcpTransport::new(), config)?;
/// monitor.start().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModbusTcpTransport {
    connect_timeout: Option<Duration>,
}

impl ModbusTcpTransport {
    /// Creates a transport that bounds connects by the endpoint read timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a dedicated timeout for TCP connects.
    ///
    /// [`ConnectionManager`](crate::ConnectionManager) also bounds every
    /// open by the endpoint read timeout, so only a shorter value has an
    /// effect there.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    async fn resolve(config: &EndpointConfig) -> Result<SocketAddr, TransportError> {
        let endpoint = config.endpoint();
        tokio::net::lookup_host((config.host.as_str(), config.port))
            .await
            .map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint}: {e}")))?
            .next()
            .ok_or_else(|| TransportError::InvalidEndpoint(format!("{endpoint}: no address")))
    }
}

impl Transport for ModbusTcpTransport {
    type Session = Context;

    async fn open(&self, config: &EndpointConfig) -> Result<Context, TransportError> {
        let socket_addr = Self::resolve(config).await?;
        let slave = Slave(config.unit_id);
        let timeout = self.connect_timeout.unwrap_or(config.read_timeout);

        tracing::debug!(%socket_addr, unit_id = config.unit_id, "Opening Modbus TCP session");

        match tokio::time::timeout(timeout, tcp::connect_slave(socket_addr, slave)).await {
            Ok(Ok(ctx)) => Ok(ctx),
            Ok(Err(e)) => Err(TransportError::ConnectFailed(format!("{socket_addr}: {e}"))),
            Err(_) => Err(TransportError::ConnectFailed(format!(
                "{socket_addr}: connect timed out after {} ms",
                timeout_ms(timeout)
            ))),
        }
    }

    async fn close(&self, mut session: Context) -> Result<(), TransportError> {
        session
            .disconnect()
            .await
            .map_err(|e| TransportError::CloseFailed(e.to_string()))
    }

    async fn read_point(
        &self,
        session: &mut Context,
        address: &PointAddress,
        timeout: Duration,
    ) -> Result<RawReading, TransportError> {
        let request = async {
            let response = match address {
                PointAddress::DiscreteInput(offset) => session.read_discrete_inputs(*offset, 1).await,
                PointAddress::Coil(offset) => session.read_coils(*offset, 1).await,
                PointAddress::Tag(name) => {
                    return Err(TransportError::UnsupportedAddress(format!(
                        "Modbus cannot read tag {name}"
                    )));
                }
            };
            response.map_err(|e| TransportError::ReadFault(e.to_string()))
        };

        let bits = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| TransportError::Timeout(timeout_ms(timeout)))??
            .map_err(|code| TransportError::ReadFault(format!("Modbus exception: {code:?}")))?;

        Ok(RawReading::Bits(bits))
    }
}
