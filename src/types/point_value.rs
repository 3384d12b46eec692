// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalized value of the monitored point.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed scalar read from the device.
///
/// Discrete inputs normalize to [`PointValue::Bool`]. Booleans display as
/// `1` and `0`, the way PLC tooling reports input states.
///
/// # Examples
///
/// ```
/// use plc_monitor::types::PointValue;
///
/// assert_eq!(PointValue::Bool(true).to_string(), "1");
/// assert_eq!(PointValue::Int(-4).to_string(), "-4");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    /// A discrete on/off state.
    Bool(bool),
    /// An integer (register or integer tag).
    Int(i64),
    /// A floating-point value.
    Float(f64),
}

impl PointValue {
    /// Returns the boolean state, if this is a discrete value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns true if both values report the same device state.
    ///
    /// Unlike `==`, two NaN floats compare as the same, so a device that
    /// keeps reporting NaN is not seen as changing on every read.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) if a.is_nan() && b.is_nan() => true,
            _ => self == other,
        }
    }
}

impl From<bool> for PointValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PointValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PointValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", u8::from(*b)),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}
