// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level monitor wiring connection management and polling together.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::MonitorConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::{Error, Result};
use crate::event::{EventBus, MonitorEvent};
use crate::poll::{self, PollScheduler, PollStatus};
use crate::state::PointSnapshot;
use crate::transport::Transport;
use crate::types::PointValue;

/// Monitors a single point on a single device.
///
/// `PointMonitor` owns the [`ConnectionManager`] and the [`PollScheduler`].
/// [`start`](Self::start) makes the initial connect attempt and spawns the
/// poll loop; [`shutdown`](Self::shutdown) stops the loop, cancels any
/// pending reconnect, and closes the session.
///
/// Reporters observe the monitor through:
///
/// - [`watch_status`](Self::watch_status): the status string of every cycle
/// - [`watch_value`](Self::watch_value): the baseline and each change
/// - [`subscribe`](Self::subscribe): structured [`MonitorEvent`]s
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use plc_monitor::PointMonitor;
/// use plc_monitor::config::{EndpointConfig, MonitorConfig};
/// use plc_monitor::testing::ScriptedTransport;
/// use plc_monitor::types::PointAddress;
///
/// # #[tokio::main]
/// # async fn main() -> plc_monitor::Result<()> {
/// let transport = ScriptedTransport::new();
/// transport.push_readings([false, true]);
///
/// let config = MonitorConfig::new(
///     EndpointConfig::new("192.168.29.1").with_unit_id(25),
///     PointAddress::DiscreteInput(24576),
/// );
/// let monitor = PointMonitor::new(transport, config)?;
///
/// monitor.connect().await?;
/// assert_eq!(monitor.poll_once().await.to_string(), "Digital input state: 0");
/// assert_eq!(monitor.poll_once().await.to_string(), "Digital input state: 1");
///
/// monitor.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct PointMonitor<T: Transport> {
    config: MonitorConfig,
    manager: ConnectionManager<T>,
    scheduler: Arc<PollScheduler<T>>,
    event_bus: EventBus,
    shutdown_tx: watch::Sender<bool>,
    poll_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport> PointMonitor<T> {
    /// Creates a monitor. Nothing connects until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(transport: T, config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new();
        let manager = ConnectionManager::new(transport, config.endpoint.clone(), event_bus.clone());
        let scheduler = Arc::new(PollScheduler::new(
            manager.clone(),
            &config,
            event_bus.clone(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            manager,
            scheduler,
            event_bus,
            shutdown_tx,
            poll_task: parking_lot::Mutex::new(None),
        })
    }

    /// Connects and starts the poll loop.
    ///
    /// A failed initial connect is not an error: it is logged, retried on the
    /// connect retry delay, and the loop starts anyway. Calling `start` on a
    /// running monitor does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`] if the monitor has been shut down.
    pub async fn start(&self) -> Result<()> {
        if *self.shutdown_tx.borrow() {
            return Err(Error::ShutDown);
        }
        if self.is_running() {
            return Ok(());
        }

        tracing::info!(
            endpoint = %self.config.endpoint.endpoint(),
            point = %self.config.point,
            label = %self.config.label,
            "Starting monitor"
        );

        match self.manager.connect().await {
            Ok(()) => {}
            Err(Error::ShutDown) => return Err(Error::ShutDown),
            Err(e) => tracing::warn!(error = %e, "Initial connect failed, retrying in background"),
        }

        let mut poll_task = self.poll_task.lock();
        if poll_task.is_none() {
            *poll_task = Some(poll::spawn(
                Arc::clone(&self.scheduler),
                self.shutdown_tx.subscribe(),
            ));
        }

        Ok(())
    }

    /// Attempts a connect without starting the poll loop.
    ///
    /// # Errors
    ///
    /// Returns the error of the attempt. A retry is scheduled either way.
    pub async fn connect(&self) -> Result<()> {
        self.manager.connect().await
    }

    /// Runs one poll cycle immediately.
    ///
    /// Waits for a cycle already in progress to finish first.
    pub async fn poll_once(&self) -> PollStatus {
        self.scheduler.poll_once().await
    }

    /// Stops the poll loop, cancels reconnection, and closes the session.
    ///
    /// A read in progress finishes or times out before the loop exits.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);

        let poll_task = self.poll_task.lock().take();
        if let Some(handle) = poll_task
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "Poll loop ended abnormally");
        }

        self.manager.shutdown().await;
        tracing::info!(endpoint = %self.config.endpoint.endpoint(), "Monitor stopped");
    }

    /// Returns true while the poll loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.poll_task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns the status of the last cycle.
    #[must_use]
    pub fn status(&self) -> PollStatus {
        self.scheduler.status()
    }

    /// Creates a receiver for cycle statuses.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<PollStatus> {
        self.scheduler.watch_status()
    }

    /// Returns the last successfully read value.
    #[must_use]
    pub fn value(&self) -> Option<PointValue> {
        self.snapshot().map(|s| s.value)
    }

    /// Returns the last successfully read value with its timestamp.
    #[must_use]
    pub fn snapshot(&self) -> Option<PointSnapshot> {
        self.scheduler.snapshot()
    }

    /// Creates a receiver that observes the baseline and each change.
    #[must_use]
    pub fn watch_value(&self) -> watch::Receiver<Option<PointSnapshot>> {
        self.scheduler.watch_value()
    }

    /// Subscribes to monitor events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_bus.subscribe()
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Creates a receiver for connection state changes.
    #[must_use]
    pub fn watch_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.manager.watch_state()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Returns the connection manager.
    #[must_use]
    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.manager
    }
}

impl<T: Transport> Drop for PointMonitor<T> {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(handle) = self.poll_task.get_mut().take() {
            handle.abort();
        }
    }
}

impl<T: Transport> std::fmt::Debug for PointMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointMonitor")
            .field("config", &self.config)
            .field("connection", &self.manager)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
