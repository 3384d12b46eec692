// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types describing the monitored point.
//!
//! - [`PointAddress`]: where the point lives on the device
//! - [`PointValue`]: the normalized reading

mod point_address;
mod point_value;

pub use point_address::PointAddress;
pub use point_value::PointValue;
