// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line monitor for a single PLC point.
//!
//! ```text
//! plc-monitor [config.json]
//! ```
//!
//! Without a config file, watches discrete input 24576 on unit 25 at
//! `192.168.29.1:502`. Status lines go to stdout, logs to stderr (filtered
//! by `RUST_LOG`, default `info`). Ctrl-C shuts down cleanly.

use std::process::ExitCode;

use plc_monitor::config::{EndpointConfig, MonitorConfig};
use plc_monitor::transport::ModbusTcpTransport;
use plc_monitor::types::PointAddress;
use plc_monitor::PointMonitor;
use tracing_subscriber::EnvFilter;

const DEFAULT_HOST: &str = "192.168.29.1";
const DEFAULT_UNIT_ID: u8 = 25;
const DEFAULT_POINT: PointAddress = PointAddress::DiscreteInput(24576);

fn default_config() -> MonitorConfig {
    MonitorConfig::new(
        EndpointConfig::new(DEFAULT_HOST).with_unit_id(DEFAULT_UNIT_ID),
        DEFAULT_POINT,
    )
}

fn load_config() -> plc_monitor::Result<MonitorConfig> {
    match std::env::args_os().nth(1) {
        Some(path) => {
            tracing::info!(path = %path.to_string_lossy(), "Loading configuration");
            Ok(MonitorConfig::from_json_file(path)?)
        }
        None => Ok(default_config()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let monitor = match PointMonitor::new(ModbusTcpTransport::new(), config) {
        Ok(monitor) => monitor,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let mut status = monitor.watch_status();

    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            println!("{}", *status.borrow_and_update());
        }
    });

    if let Err(e) = monitor.start().await {
        tracing::error!(error = %e, "Failed to start monitor");
        return ExitCode::FAILURE;
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }

    tracing::info!("Shutting down");
    monitor.shutdown().await;

    ExitCode::SUCCESS
}
