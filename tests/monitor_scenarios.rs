// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end monitor behavior against a scripted transport.
//!
//! Timer-driven tests run on a paused tokio clock, so retry delays and poll
//! intervals elapse instantly and deterministically.

use std::time::Duration;

use plc_monitor::config::{EndpointConfig, MonitorConfig};
use plc_monitor::testing::ScriptedTransport;
use plc_monitor::types::{PointAddress, PointValue};
use plc_monitor::{ConnectionState, MonitorEvent, PointMonitor, PollStatus};
use tokio::sync::broadcast;

fn config() -> MonitorConfig {
    MonitorConfig::new(
        EndpointConfig::new("192.168.29.1").with_unit_id(25),
        PointAddress::DiscreteInput(24576),
    )
}

fn monitor(transport: &ScriptedTransport) -> PointMonitor<ScriptedTransport> {
    PointMonitor::new(transport.clone(), config()).unwrap()
}

fn drain(events: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

// ============================================================================
// Change Detection
// ============================================================================

mod change_detection {
    use super::*;

    #[tokio::test]
    async fn changes_reported_only_on_differing_readings() {
        let transport = ScriptedTransport::new();
        transport.push_readings([false, false, true, true, false]);
        let monitor = monitor(&transport);
        monitor.connect().await.unwrap();
        let mut events = monitor.subscribe();

        let mut changes = Vec::new();
        let mut baselines = Vec::new();
        let mut quiet = Vec::new();

        for index in 0..5 {
            let status = monitor.poll_once().await;
            assert!(status.value().is_some());

            let cycle_events = drain(&mut events);
            for event in &cycle_events {
                match event {
                    MonitorEvent::Baseline { .. } => baselines.push(index),
                    MonitorEvent::ValueChanged { .. } => changes.push(index),
                    other => panic!("unexpected event {other:?}"),
                }
            }
            if cycle_events.iter().all(|e| !e.is_change()) {
                quiet.push(index);
            }
        }

        assert_eq!(baselines, vec![0]);
        assert_eq!(changes, vec![2, 4]);
        assert_eq!(quiet, vec![0, 1, 3]);
        assert_eq!(monitor.value(), Some(PointValue::Bool(false)));
    }

    #[tokio::test]
    async fn change_event_carries_previous_and_current() {
        let transport = ScriptedTransport::new();
        transport.push_readings([false, true]);
        let monitor = monitor(&transport);
        monitor.connect().await.unwrap();

        monitor.poll_once().await;
        let mut events = monitor.subscribe();
        monitor.poll_once().await;

        match events.try_recv().unwrap() {
            MonitorEvent::ValueChanged { previous, current } => {
                assert_eq!(previous, PointValue::Bool(false));
                assert_eq!(current.value, PointValue::Bool(true));
            }
            other => panic!("expected change, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_strings_use_label() {
        let transport = ScriptedTransport::new();
        transport.push_readings([true]);
        let monitor =
            PointMonitor::new(transport.clone(), config().with_label("Door sensor")).unwrap();
        monitor.connect().await.unwrap();

        assert_eq!(
            monitor.poll_once().await.to_string(),
            "Door sensor state: 1"
        );
    }
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

mod connection_lifecycle {
    use super::*;

    #[tokio::test]
    async fn connect_is_idempotent() {
        let transport = ScriptedTransport::new();
        let monitor = monitor(&transport);

        monitor.connect().await.unwrap();
        monitor.connect().await.unwrap();

        assert_eq!(transport.open_count(), 1);
        assert_eq!(monitor.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failures_are_retried_until_success() {
        let transport = ScriptedTransport::new();
        transport.fail_next_opens(3, "connection refused");
        let monitor = monitor(&transport);
        let mut events = monitor.subscribe();

        monitor.start().await.unwrap();

        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(5)).await;
            assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        let connection_events: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(MonitorEvent::is_connection)
            .collect();
        let failures = connection_events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::ConnectFailed { .. }))
            .count();
        let successes = connection_events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::Connected { .. }))
            .count();

        assert_eq!(failures, 3);
        assert_eq!(successes, 1);
        assert_eq!(monitor.connection_state(), ConnectionState::Connected);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_spaced_by_retry_delay() {
        let transport = ScriptedTransport::new();
        transport.fail_next_opens(5, "host unreachable");
        let monitor = monitor(&transport);

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(45)).await;

        let opens = transport.open_times();
        assert_eq!(opens.len(), 5);
        for pair in opens.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(10));
        }
        assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);
        assert_eq!(monitor.connection().consecutive_failures(), 5);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_numbers_increase() {
        let transport = ScriptedTransport::new();
        transport.fail_next_opens(2, "refused");
        let monitor = monitor(&transport);
        let mut events = monitor.subscribe();

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;

        let attempts: Vec<u32> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                MonitorEvent::ConnectFailed { attempt, .. } => Some(attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2]);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hung_reconnect_does_not_stall_monitor() {
        let transport = ScriptedTransport::new();
        transport.push_open_success();
        transport.push_open_hang();
        transport.push_read_fault("connection reset");
        let monitor = monitor(&transport);

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(transport.open_count() >= 3);
        assert_eq!(monitor.connection_state(), ConnectionState::Connected);
        assert!(monitor.status().value().is_some());

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_reconnect() {
        let transport = ScriptedTransport::new();
        transport.fail_next_opens(1, "refused");
        let monitor = monitor(&transport);

        monitor.start().await.unwrap();
        monitor.shutdown().await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(transport.open_count(), 1);
        assert!(!monitor.is_running());
    }
}

// ============================================================================
// Read Failures
// ============================================================================

mod read_failures {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn no_read_is_issued_while_disconnected() {
        let transport = ScriptedTransport::new();
        transport.fail_next_opens(100, "refused");
        let monitor = monitor(&transport);

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(transport.read_count(), 0);
        assert_eq!(monitor.status(), PollStatus::NotConnected);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_read_disconnects_then_reports_not_connected() {
        let transport = ScriptedTransport::new();
        transport.push_reading(true);
        transport.push_read_fault("connection reset by peer");
        let monitor = monitor(&transport);
        monitor.connect().await.unwrap();
        let mut events = monitor.subscribe();

        assert_eq!(
            monitor.poll_once().await.to_string(),
            "Digital input state: 1"
        );

        let mut values = monitor.watch_value();
        values.borrow_and_update();

        let failed = monitor.poll_once().await;
        assert_eq!(
            failed.to_string(),
            "Error: transport error: read failed: connection reset by peer"
        );
        assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);
        assert_eq!(monitor.value(), Some(PointValue::Bool(true)));
        assert!(!values.has_changed().unwrap());

        assert_eq!(monitor.poll_once().await, PollStatus::NotConnected);

        let observed = drain(&mut events);
        assert!(
            observed
                .iter()
                .any(|e| matches!(e, MonitorEvent::ReadFailed { .. }))
        );
        assert!(
            observed
                .iter()
                .any(|e| matches!(e, MonitorEvent::Disconnected { error: Some(_) }))
        );

        // Reconnects after the read failure retry delay and resumes reading
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(monitor.connection_state(), ConnectionState::Connected);
        assert!(monitor.poll_once().await.value().is_some());
        assert_eq!(monitor.value(), Some(PointValue::Bool(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_keeps_last_value() {
        let transport = ScriptedTransport::new();
        transport.push_reading(true);
        transport.push_read_hang();
        let monitor = monitor(&transport);
        monitor.connect().await.unwrap();
        monitor.poll_once().await;
        let before = monitor.snapshot().unwrap();
        let mut values = monitor.watch_value();
        values.borrow_and_update();

        assert!(monitor.poll_once().await.is_error());

        assert_eq!(monitor.snapshot(), Some(before));
        assert!(!values.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn read_timeout_becomes_error_status() {
        let transport = ScriptedTransport::new();
        transport.push_read_hang();
        let monitor = monitor(&transport);
        monitor.connect().await.unwrap();

        let status = monitor.poll_once().await;

        assert_eq!(
            status.to_string(),
            "Error: transport error: read timed out after 3000 ms"
        );
        assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_loop_survives_repeated_failures() {
        let transport = ScriptedTransport::new();
        transport.push_read_fault("bus error");
        transport.push_read_hang();
        transport.push_read_fault("bus error");
        let monitor = monitor(&transport);

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(90)).await;

        assert!(monitor.is_running());
        assert!(transport.read_count() > 3);
        assert_eq!(monitor.value(), Some(PointValue::Bool(false)));

        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn empty_reading_keeps_session() {
        let transport = ScriptedTransport::new();
        transport.push_reading(plc_monitor::RawReading::Bits(Vec::new()));
        transport.push_reading(true);
        let monitor = monitor(&transport);
        monitor.connect().await.unwrap();

        assert!(monitor.poll_once().await.is_error());
        assert_eq!(monitor.connection_state(), ConnectionState::Connected);
        assert_eq!(monitor.value(), None);

        monitor.poll_once().await;
        assert_eq!(monitor.value(), Some(PointValue::Bool(true)));
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn cycles_never_read_concurrently() {
        let transport = ScriptedTransport::new().with_read_latency(Duration::from_secs(2));
        let monitor = Arc::new(monitor(&transport));
        monitor.start().await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                tokio::spawn(async move { monitor.poll_once().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert!(transport.read_count() >= 5);
        assert_eq!(transport.max_concurrent_reads(), 1);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn status_watch_sees_each_cycle() {
        let transport = ScriptedTransport::new();
        transport.push_readings([true, true]);
        let monitor = monitor(&transport);
        let mut status = monitor.watch_status();

        monitor.start().await.unwrap();
        status.changed().await.unwrap();
        assert_eq!(
            status.borrow_and_update().to_string(),
            "Digital input state: 1"
        );

        status.changed().await.unwrap();
        assert_eq!(
            status.borrow_and_update().to_string(),
            "Digital input state: 1"
        );

        monitor.shutdown().await;
    }
}
