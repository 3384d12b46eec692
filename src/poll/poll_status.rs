// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outcome of a single poll cycle.

use std::fmt;

use crate::types::PointValue;

/// What a poll cycle observed, in the form reporters print.
///
/// # Examples
///
/// ```
/// use plc_monitor::poll::PollStatus;
/// use plc_monitor::types::PointValue;
///
/// let status = PollStatus::Value {
///     label: "Digital input".to_string(),
///     value: PointValue::Bool(true),
/// };
/// assert_eq!(status.to_string(), "Digital input state: 1");
/// assert_eq!(PollStatus::NotConnected.to_string(), "PLC not connected");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PollStatus {
    /// The point was read successfully.
    Value {
        /// Label of the point.
        label: String,
        /// The value read.
        value: PointValue,
    },
    /// No session was open; a connect was requested instead of a read.
    #[default]
    NotConnected,
    /// The read or its decoding failed.
    Error(String),
}

impl PollStatus {
    /// Returns the value read in this cycle, if any.
    #[must_use]
    pub fn value(&self) -> Option<PointValue> {
        match self {
            Self::Value { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Returns true if the cycle failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { label, value } => write!(f, "{label} state: {value}"),
            Self::NotConnected => f.write_str("PLC not connected"),
            Self::Error(message) => write!(f, "Error: {message}"),
        }
    }
}
