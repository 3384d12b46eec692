// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Testing utilities.
//!
//! [`ScriptedTransport`] replaces a real fieldbus client with a queue of
//! scripted outcomes and records every call made against it, so connection
//! and polling behavior can be tested without hardware.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::EndpointConfig;
use crate::error::TransportError;
use crate::transport::{RawReading, Transport, timeout_ms};
use crate::types::PointAddress;

#[derive(Debug)]
enum OpenOutcome {
    Success,
    Fail(String),
    Hang,
}

#[derive(Debug)]
enum ReadOutcome {
    Reading(RawReading),
    Fault(String),
    Hang,
}

#[derive(Debug, Default)]
struct Script {
    open_outcomes: VecDeque<OpenOutcome>,
    read_outcomes: VecDeque<ReadOutcome>,
    close_fails: bool,
    read_latency: Duration,
    open_times: Vec<Instant>,
    reads: usize,
    closes: usize,
    in_flight: usize,
    max_in_flight: usize,
    next_session: u64,
}

/// Session handle handed out by [`ScriptedTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedSession {
    id: u64,
}

impl ScriptedSession {
    /// Sequence number of this session, starting at 1.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A [`Transport`] driven by scripted outcomes.
///
/// Opens succeed and reads return a single `false` bit unless an outcome
/// has been queued. Clones share the same script and call records.
///
/// # Examples
///
/// ```
/// use plc_monitor::testing::ScriptedTransport;
///
/// let transport = ScriptedTransport::new();
/// transport.fail_next_opens(2, "connection refused");
/// transport.push_readings([false, true]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Creates a transport with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every read take `latency` before completing.
    #[must_use]
    pub fn with_read_latency(self, latency: Duration) -> Self {
        self.script.lock().read_latency = latency;
        self
    }

    /// Queues `count` failing opens.
    pub fn fail_next_opens(&self, count: usize, error: &str) {
        let mut script = self.script.lock();
        for _ in 0..count {
            script.open_outcomes.push_back(OpenOutcome::Fail(error.to_string()));
        }
    }

    /// Queues a successful open.
    pub fn push_open_success(&self) {
        self.script.lock().open_outcomes.push_back(OpenOutcome::Success);
    }

    /// Queues an open that never completes.
    pub fn push_open_hang(&self) {
        self.script.lock().open_outcomes.push_back(OpenOutcome::Hang);
    }

    /// Queues a reading.
    pub fn push_reading(&self, reading: impl Into<RawReading>) {
        self.script
            .lock()
            .read_outcomes
            .push_back(ReadOutcome::Reading(reading.into()));
    }

    /// Queues one single-bit reading per value.
    pub fn push_readings(&self, values: impl IntoIterator<Item = bool>) {
        let mut script = self.script.lock();
        script.read_outcomes.extend(
            values
                .into_iter()
                .map(|v| ReadOutcome::Reading(RawReading::from(v))),
        );
    }

    /// Queues a read that fails with [`TransportError::ReadFault`].
    pub fn push_read_fault(&self, error: &str) {
        self.script
            .lock()
            .read_outcomes
            .push_back(ReadOutcome::Fault(error.to_string()));
    }

    /// Queues a read that never answers and times out.
    pub fn push_read_hang(&self) {
        self.script.lock().read_outcomes.push_back(ReadOutcome::Hang);
    }

    /// Makes every close fail.
    pub fn set_close_fails(&self, fails: bool) {
        self.script.lock().close_fails = fails;
    }

    /// Number of open calls so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.script.lock().open_times.len()
    }

    /// Instants at which each open was attempted.
    #[must_use]
    pub fn open_times(&self) -> Vec<Instant> {
        self.script.lock().open_times.clone()
    }

    /// Number of read calls so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.script.lock().reads
    }

    /// Number of close calls so far.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.script.lock().closes
    }

    /// Highest number of reads that were in progress at the same time.
    #[must_use]
    pub fn max_concurrent_reads(&self) -> usize {
        self.script.lock().max_in_flight
    }
}

/// Decrements the in-flight read count even if the read is cancelled.
struct InFlight(Arc<Mutex<Script>>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.lock().in_flight -= 1;
    }
}

impl Transport for ScriptedTransport {
    type Session = ScriptedSession;

    async fn open(&self, _config: &EndpointConfig) -> Result<ScriptedSession, TransportError> {
        let outcome = {
            let mut script = self.script.lock();
            script.open_times.push(Instant::now());
            script.open_outcomes.pop_front()
        };

        match outcome {
            Some(OpenOutcome::Fail(error)) => Err(TransportError::ConnectFailed(error)),
            Some(OpenOutcome::Hang) => std::future::pending().await,
            Some(OpenOutcome::Success) | None => {
                let mut script = self.script.lock();
                script.next_session += 1;
                Ok(ScriptedSession {
                    id: script.next_session,
                })
            }
        }
    }

    async fn close(&self, _session: ScriptedSession) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        script.closes += 1;

        if script.close_fails {
            Err(TransportError::CloseFailed("scripted close failure".to_string()))
        } else {
            Ok(())
        }
    }

    async fn read_point(
        &self,
        _session: &mut ScriptedSession,
        _address: &PointAddress,
        timeout: Duration,
    ) -> Result<RawReading, TransportError> {
        let (outcome, latency) = {
            let mut script = self.script.lock();
            script.reads += 1;
            script.in_flight += 1;
            script.max_in_flight = script.max_in_flight.max(script.in_flight);
            (script.read_outcomes.pop_front(), script.read_latency)
        };
        let _in_flight = InFlight(Arc::clone(&self.script));

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match outcome {
            Some(ReadOutcome::Reading(reading)) => Ok(reading),
            Some(ReadOutcome::Fault(error)) => Err(TransportError::ReadFault(error)),
            Some(ReadOutcome::Hang) => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout(timeout_ms(timeout)))
            }
            None => Ok(RawReading::Bits(vec![false])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EndpointConfig {
        EndpointConfig::new("scripted")
    }

    #[tokio::test]
    async fn opens_follow_script() {
        let transport = ScriptedTransport::new();
        transport.fail_next_opens(1, "refused");
        transport.push_open_success();

        let first = transport.open(&config()).await;
        let second = transport.open(&config()).await.unwrap();
        let third = transport.open(&config()).await.unwrap();

        assert_eq!(
            first,
            Err(TransportError::ConnectFailed("refused".to_string()))
        );
        assert_eq!(second.id(), 1);
        assert_eq!(third.id(), 2);
        assert_eq!(transport.open_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_open_never_completes() {
        let transport = ScriptedTransport::new();
        transport.push_open_hang();

        let result =
            tokio::time::timeout(Duration::from_secs(3600), transport.open(&config())).await;

        assert!(result.is_err());
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn reads_follow_script_then_default() {
        let transport = ScriptedTransport::new();
        transport.push_reading(true);
        transport.push_read_fault("reset by peer");
        let mut session = transport.open(&config()).await.unwrap();
        let address = PointAddress::DiscreteInput(0);
        let timeout = Duration::from_secs(1);

        let first = transport.read_point(&mut session, &address, timeout).await;
        let second = transport.read_point(&mut session, &address, timeout).await;
        let third = transport.read_point(&mut session, &address, timeout).await;

        assert_eq!(first, Ok(RawReading::Bits(vec![true])));
        assert!(matches!(second, Err(TransportError::ReadFault(_))));
        assert_eq!(third, Ok(RawReading::Bits(vec![false])));
        assert_eq!(transport.read_count(), 3);
        assert_eq!(transport.max_concurrent_reads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hang_times_out() {
        let transport = ScriptedTransport::new();
        transport.push_read_hang();
        let mut session = transport.open(&config()).await.unwrap();

        let result = transport
            .read_point(
                &mut session,
                &PointAddress::Coil(1),
                Duration::from_millis(250),
            )
            .await;

        assert_eq!(result, Err(TransportError::Timeout(250)));
    }

    #[tokio::test]
    async fn close_failure_is_scripted() {
        let transport = ScriptedTransport::new();
        transport.set_close_fails(true);
        let session = transport.open(&config()).await.unwrap();

        assert!(transport.close(session).await.is_err());
        assert_eq!(transport.close_count(), 1);
    }
}
