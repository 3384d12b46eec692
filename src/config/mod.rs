// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Monitor configuration.
//!
//! Configuration is immutable once a monitor is built. It can be assembled
//! with the builder methods on [`EndpointConfig`] and [`MonitorConfig`], or
//! loaded from a JSON file:
//!
//! ```json
//! {
//!   "endpoint": {
//!     "host": "192.168.29.1",
//!     "port": 502,
//!     "unit_id": 25,
//!     "read_timeout_ms": 3000,
//!     "poll_interval_ms": 5000,
//!     "connect_retry_delay_ms": 10000,
//!     "read_failure_retry_delay_ms": 5000
//!   },
//!   "point": { "discrete_input": 24576 },
//!   "label": "Digital input"
//! }
//! ```

mod endpoint_config;
mod monitor_config;

pub use endpoint_config::{
    DEFAULT_CONNECT_RETRY_DELAY, DEFAULT_POLL_INTERVAL, DEFAULT_PORT,
    DEFAULT_READ_FAILURE_RETRY_DELAY, DEFAULT_READ_TIMEOUT, EndpointConfig,
};
pub use monitor_config::{DEFAULT_LABEL, MonitorConfig};

/// Serde helpers for durations stored as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
