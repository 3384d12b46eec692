// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level monitor configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::PointAddress;

use super::EndpointConfig;

/// Label used in status strings when none is configured.
pub const DEFAULT_LABEL: &str = "Digital input";

/// Everything a [`PointMonitor`](crate::PointMonitor) needs: the endpoint,
/// the point to watch, and the label used in status strings.
///
/// # Examples
///
/// ```
/// use plc_monitor::config::{EndpointConfig, MonitorConfig};
/// use plc_monitor::types::PointAddress;
///
/// let config = MonitorConfig::new(
///     EndpointConfig::new("192.168.29.1").with_unit_id(25),
///     PointAddress::DiscreteInput(24576),
/// )
/// .with_label("Door sensor");
///
/// assert_eq!(config.label, "Door sensor");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Device endpoint and timing.
    pub endpoint: EndpointConfig,
    /// The monitored point.
    pub point: PointAddress,
    /// Human-readable name of the point.
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

impl MonitorConfig {
    /// Creates a configuration with the default label.
    #[must_use]
    pub fn new(endpoint: EndpointConfig, point: PointAddress) -> Self {
        Self {
            endpoint,
            point,
            label: default_label(),
        }
    }

    /// Sets the label used in status strings.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input and any validation
    /// error from [`EndpointConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validates the endpoint settings.
    ///
    /// # Errors
    ///
    /// See [`EndpointConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn new_uses_default_label() {
        let config = MonitorConfig::new(EndpointConfig::new("plc"), PointAddress::Coil(1));
        assert_eq!(config.label, DEFAULT_LABEL);
    }

    #[test]
    fn parses_full_document() {
        let json = r#"{
            "endpoint": {
                "host": "192.168.29.1",
                "port": 502,
                "unit_id": 25,
                "read_timeout_ms": 3000,
                "poll_interval_ms": 5000
            },
            "point": { "discrete_input": 24576 }
        }"#;

        let config = MonitorConfig::from_json_str(json).unwrap();

        assert_eq!(config.point, PointAddress::DiscreteInput(24576));
        assert_eq!(config.label, DEFAULT_LABEL);
        assert_eq!(config.endpoint.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn parse_rejects_invalid_timing() {
        let json = r#"{
            "endpoint": { "host": "plc", "poll_interval_ms": 5 },
            "point": { "tag": "Start" }
        }"#;

        assert!(matches!(
            MonitorConfig::from_json_str(json),
            Err(ConfigError::IntervalShorterThanTimeout { .. })
        ));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(matches!(
            MonitorConfig::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            MonitorConfig::from_json_file("/nonexistent/plc_monitor.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
