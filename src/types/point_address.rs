// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Address of the monitored point.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies the monitored point on the device.
///
/// The meaning is defined by the transport: Modbus transports address
/// discrete inputs and coils by zero-based offset, tag-based transports such
/// as EtherNet/IP address a point by its symbolic name.
///
/// # Examples
///
/// ```
/// use plc_monitor::types::PointAddress;
///
/// let input = PointAddress::DiscreteInput(24576);
/// assert_eq!(input.to_string(), "discrete input 24576");
///
/// let tag = PointAddress::tag("Line1.Start");
/// assert_eq!(tag.to_string(), "tag Line1.Start");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointAddress {
    /// Modbus discrete input (function code 0x02), zero-based offset.
    DiscreteInput(u16),
    /// Modbus coil (function code 0x01), zero-based offset.
    Coil(u16),
    /// Symbolic tag name.
    Tag(String),
}

impl PointAddress {
    /// Creates a tag address.
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    /// Returns the numeric offset for register-style addresses.
    #[must_use]
    pub fn offset(&self) -> Option<u16> {
        match self {
            Self::DiscreteInput(offset) | Self::Coil(offset) => Some(*offset),
            Self::Tag(_) => None,
        }
    }
}

impl Default for PointAddress {
    fn default() -> Self {
        Self::DiscreteInput(0)
    }
}

impl fmt::Display for PointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscreteInput(offset) => write!(f, "discrete input {offset}"),
            Self::Coil(offset) => write!(f, "coil {offset}"),
            Self::Tag(name) => write!(f, "tag {name}"),
        }
    }
}
