// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Endpoint configuration: where the device is and how often to talk to it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::duration_ms;

/// Default Modbus TCP port.
pub const DEFAULT_PORT: u16 = 502;
/// Default read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);
/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default delay before retrying a failed connect.
pub const DEFAULT_CONNECT_RETRY_DELAY: Duration = Duration::from_secs(10);
/// Default delay before reconnecting after a failed read.
pub const DEFAULT_READ_FAILURE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connection and timing settings for one device.
///
/// All durations are explicit [`Duration`]s. In JSON config files they are
/// given in milliseconds (`read_timeout_ms`, `poll_interval_ms`, ...).
///
/// A failed connect waits `connect_retry_delay` before the next attempt. A
/// failed read on an open session waits `read_failure_retry_delay` before
/// reconnecting.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use plc_monitor::config::EndpointConfig;
///
/// let config = EndpointConfig::new("192.168.29.1")
///     .with_unit_id(25)
///     .with_poll_interval(Duration::from_millis(5000));
///
/// assert_eq!(config.port, 502);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Device host name or IP address.
    pub host: String,
    /// Device TCP port.
    pub port: u16,
    /// Modbus unit id or EtherNet/IP slot.
    pub unit_id: u8,
    /// Upper bound for a single read.
    #[serde(rename = "read_timeout_ms", with = "duration_ms")]
    pub read_timeout: Duration,
    /// Time between poll cycles.
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
    /// Delay before retrying a failed connect.
    #[serde(rename = "connect_retry_delay_ms", with = "duration_ms")]
    pub connect_retry_delay: Duration,
    /// Delay before reconnecting after a failed read.
    #[serde(rename = "read_failure_retry_delay_ms", with = "duration_ms")]
    pub read_failure_retry_delay: Duration,
}

impl EndpointConfig {
    /// Creates a configuration for the given host with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Sets the TCP port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the unit (or slot) identifier.
    #[must_use]
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the delay between failed connect attempts.
    #[must_use]
    pub fn with_connect_retry_delay(mut self, delay: Duration) -> Self {
        self.connect_retry_delay = delay;
        self
    }

    /// Sets the delay before reconnecting after a failed read.
    #[must_use]
    pub fn with_read_failure_retry_delay(mut self, delay: Duration) -> Self {
        self.read_failure_retry_delay = delay;
        self
    }

    /// Returns `host:port` for logging.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checks the settings for consistency.
    ///
    /// Rejects an empty host, zero durations, and a poll interval shorter
    /// than the read timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        for (name, value) in [
            ("read timeout", self.read_timeout),
            ("poll interval", self.poll_interval),
            ("connect retry delay", self.connect_retry_delay),
            ("read failure retry delay", self.read_failure_retry_delay),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        if self.poll_interval < self.read_timeout {
            return Err(ConfigError::IntervalShorterThanTimeout {
                interval_ms: self.poll_interval.as_millis(),
                timeout_ms: self.read_timeout.as_millis(),
            });
        }

        Ok(())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            unit_id: 1,
            read_timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_retry_delay: DEFAULT_CONNECT_RETRY_DELAY,
            read_failure_retry_delay: DEFAULT_READ_FAILURE_RETRY_DELAY,
        }
    }
}
