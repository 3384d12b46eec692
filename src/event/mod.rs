// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured events for reporters.
//!
//! The [`EventBus`] fans out [`MonitorEvent`]s over a tokio broadcast
//! channel, so a logger, an HTTP layer, and tests can all observe the same
//! connection and value transitions.
//!
//! # Examples
//!
//! ```
//! use plc_monitor::event::{EventBus, MonitorEvent};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(MonitorEvent::connected("192.168.29.1:502"));
//! ```

mod event_bus;
mod monitor_event;

pub use event_bus::EventBus;
pub use monitor_event::MonitorEvent;
