// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `plc_monitor` - Watch a single digital point on an industrial controller.
//!
//! This library keeps a session to a PLC alive, polls one point on a fixed
//! interval, and reports the current value, every change, and every
//! connection transition.
//!
//! # Features
//!
//! - **Connection lifecycle**: connect, fixed-delay reconnect after connect
//!   or read failures, orderly shutdown
//! - **Change detection**: the first reading is a baseline; afterwards only
//!   actual changes are reported
//! - **Failure isolation**: no connect, read, or decode failure stops the
//!   poll loop
//! - **Pluggable fieldbus**: the core is written against the
//!   [`Transport`](transport::Transport) trait; Modbus TCP is built in
//!
//! # Quick Start
//!
//! ```no_run
//! use plc_monitor::PointMonitor;
//! use plc_monitor::config::{EndpointConfig, MonitorConfig};
//! use plc_monitor::transport::ModbusTcpTransport;
//! use plc_monitor::types::PointAddress;
//!
//! #[tokio::main]
//! async fn main() -> plc_monitor::Result<()> {
//!     let config = MonitorConfig::new(
//!         EndpointConfig::new("192.168.29.1").with_unit_id(25),
//!         PointAddress::DiscreteInput(24576),
//!     );
//!
//!     let monitor = PointMonitor::new(ModbusTcpTransport::new(), config)?;
//!     let mut status = monitor.watch_status();
//!     monitor.start().await?;
//!
//!     while status.changed().await.is_ok() {
//!         println!("{}", *status.borrow());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Events
//!
//! ```no_run
//! use plc_monitor::event::MonitorEvent;
//! # use plc_monitor::PointMonitor;
//! # use plc_monitor::testing::ScriptedTransport;
//!
//! # async fn example(monitor: PointMonitor<ScriptedTransport>) {
//! let mut events = monitor.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let MonitorEvent::ValueChanged { previous, current } = event {
//!             println!("{previous} -> {}", current.value);
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! # Cargo Features
//!
//! - `modbus` (default): [`ModbusTcpTransport`](transport::ModbusTcpTransport)
//!   via `tokio-modbus`

pub mod config;
pub mod connection;
pub mod error;
pub mod event;
mod monitor;
pub mod poll;
pub mod state;
pub mod testing;
pub mod transport;
pub mod types;

pub use config::{EndpointConfig, MonitorConfig};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{ConfigError, Error, ReadingError, Result, TransportError};
pub use event::{EventBus, MonitorEvent};
pub use monitor::PointMonitor;
pub use poll::{PollScheduler, PollStatus};
pub use state::{PointSnapshot, StateTracker, Transition};
pub use transport::{RawReading, Transport};
pub use types::{PointAddress, PointValue};
