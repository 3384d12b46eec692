// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point state tracking.
//!
//! The [`StateTracker`] keeps the most recent successful reading and turns
//! each new reading into a [`Transition`]: the initial baseline, a change,
//! or no change.
//!
//! # Examples
//!
//! ```
//! use plc_monitor::state::StateTracker;
//! use plc_monitor::types::PointValue;
//!
//! let mut tracker = StateTracker::new();
//! tracker.record(PointValue::Bool(false));
//!
//! assert!(tracker.record(PointValue::Bool(true)).changed());
//! assert!(!tracker.record(PointValue::Bool(true)).changed());
//! ```

mod state_tracker;

pub use state_tracker::{PointSnapshot, StateTracker, Transition};
