// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Monitor event types.

use serde::Serialize;

use crate::state::PointSnapshot;
use crate::types::PointValue;

/// Events emitted while monitoring a point.
///
/// Connection events come from the
/// [`ConnectionManager`](crate::connection::ConnectionManager), value events
/// from the [`StateTracker`](crate::state::StateTracker) during a poll cycle.
///
/// # Examples
///
/// ```
/// use plc_monitor::event::MonitorEvent;
///
/// let event = MonitorEvent::connect_failed("10.0.0.5:502", 3, "connection refused");
/// assert!(event.is_connection());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MonitorEvent {
    /// A session was opened.
    Connected {
        /// The `host:port` of the device.
        endpoint: String,
    },

    /// A connect attempt failed; another is scheduled.
    ConnectFailed {
        /// The `host:port` of the device.
        endpoint: String,
        /// Consecutive failed attempts, starting at 1.
        attempt: u32,
        /// Why the attempt failed.
        error: String,
    },

    /// The session was closed or discarded.
    Disconnected {
        /// The failure that caused the disconnect, if any.
        error: Option<String>,
    },

    /// The first successful reading after start.
    ///
    /// This establishes the tracked value; it is not a change.
    Baseline {
        /// The initial reading.
        snapshot: PointSnapshot,
    },

    /// The point changed value.
    ValueChanged {
        /// The value before this reading.
        previous: PointValue,
        /// The new reading.
        current: PointSnapshot,
    },

    /// A read on an open session failed.
    ReadFailed {
        /// Why the read failed.
        error: String,
    },
}

impl MonitorEvent {
    /// Creates a connected event.
    #[must_use]
    pub fn connected(endpoint: impl Into<String>) -> Self {
        Self::Connected {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a failed connect event.
    #[must_use]
    pub fn connect_failed(
        endpoint: impl Into<String>,
        attempt: u32,
        error: impl Into<String>,
    ) -> Self {
        Self::ConnectFailed {
            endpoint: endpoint.into(),
            attempt,
            error: error.into(),
        }
    }

    /// Creates a disconnected event without an error.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::Disconnected { error: None }
    }

    /// Creates a disconnected event caused by an error.
    #[must_use]
    pub fn disconnected_with_error(error: impl Into<String>) -> Self {
        Self::Disconnected {
            error: Some(error.into()),
        }
    }

    /// Returns `true` for connection lifecycle events.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connected { .. } | Self::ConnectFailed { .. } | Self::Disconnected { .. }
        )
    }

    /// Returns `true` for value events (baseline or change).
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Baseline { .. } | Self::ValueChanged { .. })
    }

    /// Returns `true` only for an actual change of value.
    #[must_use]
    pub fn is_change(&self) -> bool {
        matches!(self, Self::ValueChanged { .. })
    }
}
