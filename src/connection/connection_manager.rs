// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session ownership, connect/disconnect, and fixed-delay reconnection.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::EndpointConfig;
use crate::error::{Error, Result, TransportError};
use crate::event::{EventBus, MonitorEvent};
use crate::transport::{RawReading, Transport, timeout_ms};
use crate::types::PointAddress;

use super::ConnectionState;

/// Owns the device session and keeps it alive.
///
/// The manager is the only place where the session is created, used, or
/// destroyed, and the only writer of [`ConnectionState`]. The session slot
/// is guarded by one async mutex that is held across opens and reads, so
/// connect attempts and reads never overlap.
///
/// # Reconnection
///
/// Reconnection uses fixed delays and never gives up:
///
/// - after a failed connect, the next attempt runs after
///   [`EndpointConfig::connect_retry_delay`]
/// - after a failed read, the session is discarded and a reconnect runs after
///   [`EndpointConfig::read_failure_retry_delay`]
///
/// Retries run on a single background task owned by the manager. While one
/// is pending, further schedule requests are ignored. [`shutdown`](Self::shutdown)
/// aborts it.
///
/// # Examples
///
/// ```
/// use plc_monitor::config::EndpointConfig;
/// use plc_monitor::connection::{ConnectionManager, ConnectionState};
/// use plc_monitor::event::EventBus;
/// use plc_monitor::testing::ScriptedTransport;
///
/// # #[tokio::main]
/// # async fn main() -> plc_monitor::Result<()> {
/// let manager = ConnectionManager::new(
///     ScriptedTransport::new(),
///     EndpointConfig::new("192.168.29.1"),
///     EventBus::new(),
/// );
///
/// manager.connect().await?;
/// assert_eq!(manager.state(), ConnectionState::Connected);
///
/// manager.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager<T: Transport> {
    inner: Arc<Inner<T>>,
}

struct Inner<T: Transport> {
    transport: T,
    config: EndpointConfig,
    endpoint: String,
    session: Mutex<Option<T::Session>>,
    state_tx: watch::Sender<ConnectionState>,
    retry: parking_lot::Mutex<Option<JoinHandle<()>>>,
    failed_attempts: AtomicU32,
    shut_down: AtomicBool,
    event_bus: EventBus,
}

impl<T: Transport> ConnectionManager<T> {
    /// Creates a disconnected manager.
    ///
    /// No connection is attempted until [`connect`](Self::connect) or
    /// [`ensure_connected`](Self::ensure_connected) is called.
    #[must_use]
    pub fn new(transport: T, config: EndpointConfig, event_bus: EventBus) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let endpoint = config.endpoint();

        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                endpoint,
                session: Mutex::new(None),
                state_tx,
                retry: parking_lot::Mutex::new(None),
                failed_attempts: AtomicU32::new(0),
                shut_down: AtomicBool::new(false),
                event_bus,
            }),
        }
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Returns true if a session is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Creates a watch receiver for connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Returns the endpoint configuration.
    #[must_use]
    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Number of connect attempts that failed since the last success.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.failed_attempts.load(Ordering::Relaxed)
    }

    /// Returns true if a reconnect is scheduled or in progress.
    #[must_use]
    pub fn is_reconnect_pending(&self) -> bool {
        self.inner
            .retry
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Opens a session unless one is already open.
    ///
    /// The open is bounded by the read timeout; an open that does not finish
    /// in time counts as a failed connect.
    ///
    /// On failure the state returns to [`ConnectionState::Disconnected`] and a
    /// retry is scheduled after the connect retry delay. Retries continue
    /// until a connect succeeds or the manager is shut down.
    ///
    /// # Errors
    ///
    /// Returns the transport error of this attempt, or [`Error::ShutDown`]
    /// after [`shutdown`](Self::shutdown).
    pub async fn connect(&self) -> Result<()> {
        let result = self.try_connect().await;

        if let Err(Error::Transport(_)) = result {
            self.schedule_reconnect(self.inner.config.connect_retry_delay);
        }

        result
    }

    /// Returns the current state and starts connecting in the background if
    /// disconnected.
    ///
    /// Never waits for the connect itself. If a retry is already pending its
    /// delay is honored rather than connecting early.
    pub fn ensure_connected(&self) -> ConnectionState {
        let state = self.state();

        if state == ConnectionState::Disconnected {
            self.schedule_reconnect(Duration::ZERO);
        }

        state
    }

    /// Closes the session, if any.
    ///
    /// The state becomes [`ConnectionState::Disconnected`] whether or not the
    /// transport closes cleanly.
    ///
    /// # Errors
    ///
    /// Returns the close error; it is logged and the session is discarded
    /// regardless.
    pub async fn disconnect(&self) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        let Some(open) = session.take() else {
            return Ok(());
        };

        let result = self.close_session(open).await;
        self.set_state(ConnectionState::Disconnected);
        drop(session);

        match &result {
            Ok(()) => tracing::info!(endpoint = %self.inner.endpoint, "Disconnected from PLC"),
            Err(e) => {
                tracing::error!(endpoint = %self.inner.endpoint, error = %e, "Error disconnecting from PLC");
            }
        }
        self.inner.event_bus.publish(MonitorEvent::disconnected());

        result.map_err(Error::from)
    }

    /// Stops all reconnection and closes the session.
    ///
    /// A pending retry timer is aborted, and later calls to
    /// [`connect`](Self::connect) fail with [`Error::ShutDown`].
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.inner.retry.lock().take() {
            handle.abort();
        }

        // Already logged by disconnect
        let _ = self.disconnect().await;
        self.set_state(ConnectionState::Disconnected);

        tracing::debug!(endpoint = %self.inner.endpoint, "Connection manager shut down");
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads the point on the open session, bounded by the read timeout.
    ///
    /// No read is issued without an open session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if no session is open, otherwise the
    /// transport error ([`TransportError::Timeout`] when the timeout elapses).
    pub async fn read_point(&self, address: &PointAddress) -> Result<RawReading> {
        let mut session = self.inner.session.lock().await;
        let open = session.as_mut().ok_or(Error::NotConnected)?;
        let timeout = self.inner.config.read_timeout;

        match tokio::time::timeout(
            timeout,
            self.inner.transport.read_point(open, address, timeout),
        )
        .await
        {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(TransportError::Timeout(timeout_ms(timeout)).into()),
        }
    }

    /// Discards the session after a failed read and schedules a reconnect.
    ///
    /// The reconnect runs after the read failure retry delay.
    pub async fn invalidate(&self, reason: &Error) {
        let mut session = self.inner.session.lock().await;
        let discarded = session.take();
        self.set_state(ConnectionState::Disconnected);

        if let Some(open) = discarded
            && let Err(e) = self.close_session(open).await
        {
            tracing::warn!(endpoint = %self.inner.endpoint, error = %e, "Error closing failed session");
        }
        drop(session);

        tracing::warn!(
            endpoint = %self.inner.endpoint,
            error = %reason,
            "Session invalidated after read failure"
        );
        self.inner
            .event_bus
            .publish(MonitorEvent::disconnected_with_error(reason.to_string()));

        self.schedule_reconnect(self.inner.config.read_failure_retry_delay);
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Single connect attempt without scheduling a retry.
    async fn try_connect(&self) -> Result<()> {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return Err(Error::ShutDown);
        }

        let mut session = self.inner.session.lock().await;
        if session.is_some() {
            return Ok(());
        }
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return Err(Error::ShutDown);
        }

        self.set_state(ConnectionState::Connecting);
        tracing::info!(endpoint = %self.inner.endpoint, "Connecting to PLC");

        match self.open_session().await {
            Ok(open) => {
                *session = Some(open);
                self.inner.failed_attempts.store(0, Ordering::Relaxed);
                self.set_state(ConnectionState::Connected);

                // A retry still sleeping is obsolete now. When called from the
                // retry task itself, the task finishes before its next yield.
                if let Some(handle) = self.inner.retry.lock().take() {
                    handle.abort();
                }
                drop(session);

                tracing::info!(endpoint = %self.inner.endpoint, "Successfully connected to PLC");
                self.inner
                    .event_bus
                    .publish(MonitorEvent::connected(self.inner.endpoint.clone()));
                Ok(())
            }
            Err(e) => {
                let attempt = self.inner.failed_attempts.fetch_add(1, Ordering::Relaxed) + 1;
                self.set_state(ConnectionState::Disconnected);
                drop(session);

                tracing::error!(
                    endpoint = %self.inner.endpoint,
                    attempt,
                    error = %e,
                    "Failed to connect to PLC"
                );
                self.inner.event_bus.publish(MonitorEvent::connect_failed(
                    self.inner.endpoint.clone(),
                    attempt,
                    e.to_string(),
                ));
                Err(e.into())
            }
        }
    }

    /// Starts the retry task unless one is already pending.
    ///
    /// Returns true if a new task was started.
    fn schedule_reconnect(&self, delay: Duration) -> bool {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return false;
        }

        let mut retry = self.inner.retry.lock();
        if retry.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        tracing::debug!(
            endpoint = %self.inner.endpoint,
            delay_ms = timeout_ms(delay),
            "Scheduling reconnect"
        );

        let weak = Arc::downgrade(&self.inner);
        *retry = Some(tokio::spawn(Self::reconnect_loop(weak, delay)));
        true
    }

    /// Sleeps, attempts a connect, and repeats with the connect retry delay
    /// until a connect succeeds, the manager shuts down, or it is dropped.
    async fn reconnect_loop(inner: Weak<Inner<T>>, mut delay: Duration) {
        loop {
            tokio::time::sleep(delay).await;

            let Some(inner) = inner.upgrade() else {
                break;
            };
            let manager = Self { inner };

            match manager.try_connect().await {
                Ok(()) | Err(Error::ShutDown) => break,
                Err(_) => delay = manager.inner.config.connect_retry_delay,
            }
        }
    }

    /// Opens a session, bounded by the read timeout.
    async fn open_session(&self) -> std::result::Result<T::Session, TransportError> {
        let timeout = self.inner.config.read_timeout;
        match tokio::time::timeout(timeout, self.inner.transport.open(&self.inner.config)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ConnectFailed(format!(
                "connect timed out after {} ms",
                timeout_ms(timeout)
            ))),
        }
    }

    /// Closes a session, bounded by the read timeout.
    async fn close_session(&self, session: T::Session) -> std::result::Result<(), TransportError> {
        let timeout = self.inner.config.read_timeout;
        match tokio::time::timeout(timeout, self.inner.transport.close(session)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::CloseFailed(format!(
                "close timed out after {} ms",
                timeout_ms(timeout)
            ))),
        }
    }

    fn set_state(&self, new_state: ConnectionState) {
        let changed = self.inner.state_tx.send_if_modified(|state| {
            if *state == new_state {
                false
            } else {
                *state = new_state;
                true
            }
        });

        if changed {
            tracing::debug!(endpoint = %self.inner.endpoint, state = %new_state, "Connection state changed");
        }
    }
}

impl<T: Transport> Clone for ConnectionManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> std::fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .field("reconnect_pending", &self.is_reconnect_pending())
            .finish_non_exhaustive()
    }
}
