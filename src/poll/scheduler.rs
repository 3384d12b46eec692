// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic read cycle.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;

use crate::config::MonitorConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::Error;
use crate::event::{EventBus, MonitorEvent};
use crate::state::{PointSnapshot, StateTracker, Transition};
use crate::transport::Transport;
use crate::types::PointAddress;

use super::PollStatus;

/// Runs read cycles against a [`ConnectionManager`].
///
/// Each cycle either reads the point or, without a session, asks the manager
/// to reconnect. Every failure becomes a [`PollStatus::Error`]; nothing in a
/// cycle can stop the loop.
///
/// Cycles never overlap. [`run`](Self::run) awaits each cycle before the next
/// tick, and concurrent [`poll_once`](Self::poll_once) callers wait on the
/// tracker lock.
pub struct PollScheduler<T: Transport> {
    manager: ConnectionManager<T>,
    point: PointAddress,
    label: String,
    interval: std::time::Duration,
    tracker: Mutex<StateTracker>,
    value_rx: watch::Receiver<Option<PointSnapshot>>,
    status_tx: watch::Sender<PollStatus>,
    event_bus: EventBus,
}

impl<T: Transport> PollScheduler<T> {
    /// Creates a scheduler for the point described by `config`.
    #[must_use]
    pub fn new(manager: ConnectionManager<T>, config: &MonitorConfig, event_bus: EventBus) -> Self {
        let tracker = StateTracker::new();
        let value_rx = tracker.watch();
        let (status_tx, _) = watch::channel(PollStatus::default());

        Self {
            manager,
            point: config.point.clone(),
            label: config.label.clone(),
            interval: config.endpoint.poll_interval,
            tracker: Mutex::new(tracker),
            value_rx,
            status_tx,
            event_bus,
        }
    }

    /// Returns the status of the last completed cycle.
    #[must_use]
    pub fn status(&self) -> PollStatus {
        self.status_tx.borrow().clone()
    }

    /// Creates a receiver that observes every cycle's status.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<PollStatus> {
        self.status_tx.subscribe()
    }

    /// Creates a receiver that observes the baseline and each change.
    #[must_use]
    pub fn watch_value(&self) -> watch::Receiver<Option<PointSnapshot>> {
        self.value_rx.clone()
    }

    /// Returns the last successfully read value with its timestamp.
    #[must_use]
    pub fn snapshot(&self) -> Option<PointSnapshot> {
        *self.value_rx.borrow()
    }

    /// Runs one cycle and publishes its status.
    pub async fn poll_once(&self) -> PollStatus {
        let mut tracker = self.tracker.lock().await;
        let status = self.cycle(&mut tracker).await;
        drop(tracker);

        tracing::debug!(point = %self.point, %status, "Poll cycle finished");
        self.status_tx.send_replace(status.clone());
        status
    }

    /// Runs cycles every poll interval until `shutdown` becomes `true` or its
    /// sender is dropped.
    ///
    /// The first cycle runs immediately. Ticks missed while a cycle was
    /// running are skipped, not bunched up. A cycle in progress when shutdown
    /// is requested runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(
            point = %self.point,
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Poll loop started"
        );

        while !*shutdown.borrow_and_update() {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {}
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }

            if shutdown.has_changed().is_err() {
                break;
            }
        }

        tracing::debug!(point = %self.point, "Poll loop stopped");
    }

    async fn cycle(&self, tracker: &mut StateTracker) -> PollStatus {
        if self.manager.state() != ConnectionState::Connected {
            tracing::warn!(point = %self.point, "PLC not connected, attempting to reconnect");
            self.manager.ensure_connected();
            return PollStatus::NotConnected;
        }

        let raw = match self.manager.read_point(&self.point).await {
            Ok(raw) => raw,
            // Session dropped between the state check and the read
            Err(Error::NotConnected) => {
                self.manager.ensure_connected();
                return PollStatus::NotConnected;
            }
            Err(e) => {
                tracing::error!(point = %self.point, error = %e, "Failed to read point");
                self.event_bus.publish(MonitorEvent::ReadFailed {
                    error: e.to_string(),
                });
                if e.invalidates_session() {
                    self.manager.invalidate(&e).await;
                }
                return PollStatus::Error(e.to_string());
            }
        };

        match tracker.update(&raw) {
            Ok(transition) => {
                self.log_transition(&transition);
                if let Some(event) = transition.to_event() {
                    self.event_bus.publish(event);
                }
                PollStatus::Value {
                    label: self.label.clone(),
                    value: transition.value(),
                }
            }
            Err(e) => {
                let e = Error::from(e);
                tracing::error!(point = %self.point, error = %e, ?raw, "Failed to decode reading");
                self.event_bus.publish(MonitorEvent::ReadFailed {
                    error: e.to_string(),
                });
                PollStatus::Error(e.to_string())
            }
        }
    }

    fn log_transition(&self, transition: &Transition) {
        match transition {
            Transition::Baseline(snapshot) => {
                tracing::info!(
                    label = %self.label,
                    value = %snapshot.value,
                    "Current value"
                );
            }
            Transition::Changed { previous, current } => {
                tracing::info!(
                    label = %self.label,
                    previous = %previous,
                    current = %current.value,
                    "Value changed"
                );
            }
            Transition::Unchanged(snapshot) => {
                tracing::debug!(label = %self.label, value = %snapshot.value, "Value unchanged");
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for PollScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("point", &self.point)
            .field("label", &self.label)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Spawns [`PollScheduler::run`] on the current runtime.
pub(crate) fn spawn<T: Transport>(
    scheduler: Arc<PollScheduler<T>>,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { scheduler.run(shutdown).await })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::EndpointConfig;
    use crate::testing::ScriptedTransport;
    use crate::transport::RawReading;
    use crate::types::PointValue;

    fn scheduler_with(transport: &ScriptedTransport) -> (PollScheduler<ScriptedTransport>, EventBus) {
        let bus = EventBus::new();
        let config = MonitorConfig::new(
            EndpointConfig::new("plc").with_unit_id(25),
            PointAddress::DiscreteInput(24576),
        );
        let manager = ConnectionManager::new(transport.clone(), config.endpoint.clone(), bus.clone());
        (PollScheduler::new(manager, &config, bus.clone()), bus)
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_cycle_requests_connect_without_reading() {
        let transport = ScriptedTransport::new();
        let (scheduler, _) = scheduler_with(&transport);

        let status = scheduler.poll_once().await;

        assert_eq!(status, PollStatus::NotConnected);
        assert_eq!(transport.read_count(), 0);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(scheduler.manager.is_connected());
    }

    #[tokio::test]
    async fn connected_cycle_reports_value() {
        let transport = ScriptedTransport::new();
        transport.push_reading(true);
        let (scheduler, bus) = scheduler_with(&transport);
        let mut events = bus.subscribe();
        scheduler.manager.connect().await.unwrap();
        let _ = events.recv().await;

        let status = scheduler.poll_once().await;

        assert_eq!(status.to_string(), "Digital input state: 1");
        assert_eq!(scheduler.status(), status);
        assert!(matches!(
            events.recv().await.unwrap(),
            MonitorEvent::Baseline { .. }
        ));
    }

    #[tokio::test]
    async fn decode_failure_keeps_session() {
        let transport = ScriptedTransport::new();
        transport.push_reading(RawReading::Bits(Vec::new()));
        let (scheduler, _) = scheduler_with(&transport);
        scheduler.manager.connect().await.unwrap();

        let status = scheduler.poll_once().await;

        assert_eq!(status, PollStatus::Error("reading error: reading contained no data".to_string()));
        assert!(scheduler.manager.is_connected());
        assert_eq!(transport.close_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn read_fault_invalidates_session() {
        let transport = ScriptedTransport::new();
        transport.push_read_fault("connection reset");
        let (scheduler, _) = scheduler_with(&transport);
        scheduler.manager.connect().await.unwrap();

        let status = scheduler.poll_once().await;

        assert!(status.is_error());
        assert_eq!(scheduler.manager.state(), ConnectionState::Disconnected);
        assert_eq!(scheduler.poll_once().await, PollStatus::NotConnected);
    }

    #[tokio::test]
    async fn value_watch_sees_only_changes() {
        let transport = ScriptedTransport::new();
        transport.push_readings([false, false, true]);
        let (scheduler, _) = scheduler_with(&transport);
        scheduler.manager.connect().await.unwrap();
        let mut values = scheduler.watch_value();

        scheduler.poll_once().await;
        assert!(values.has_changed().unwrap());
        values.borrow_and_update();

        scheduler.poll_once().await;
        assert!(!values.has_changed().unwrap());

        scheduler.poll_once().await;
        assert_eq!(
            values.borrow_and_update().map(|s| s.value),
            Some(PointValue::Bool(true))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown() {
        let transport = ScriptedTransport::new();
        let (scheduler, _) = scheduler_with(&transport);
        scheduler.manager.connect().await.unwrap();
        let scheduler = Arc::new(scheduler);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn(Arc::clone(&scheduler), shutdown_rx);
        tokio::time::sleep(Duration::from_secs(12)).await;
        shutdown_tx.send_replace(true);
        handle.await.unwrap();

        // Ticks at 0, 5 and 10 seconds
        assert_eq!(transport.read_count(), 3);
    }
}
