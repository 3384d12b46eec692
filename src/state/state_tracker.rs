// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-known value tracking and edge detection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::ReadingError;
use crate::event::MonitorEvent;
use crate::transport::RawReading;
use crate::types::PointValue;

/// A value together with the time of the read that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointSnapshot {
    /// The normalized value.
    pub value: PointValue,
    /// When the read completed.
    pub observed_at: DateTime<Utc>,
}

impl PointSnapshot {
    /// Creates a snapshot stamped with the current time.
    #[must_use]
    pub fn now(value: PointValue) -> Self {
        Self {
            value,
            observed_at: Utc::now(),
        }
    }
}

/// Outcome of feeding one reading to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// First reading since start; establishes the tracked value.
    Baseline(PointSnapshot),
    /// The value differs from the previous reading.
    Changed {
        /// The value before this reading.
        previous: PointValue,
        /// The new reading.
        current: PointSnapshot,
    },
    /// Same value as before.
    Unchanged(PointSnapshot),
}

impl Transition {
    /// Returns `true` only for an actual change of value.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// Returns the value after this reading.
    #[must_use]
    pub fn value(&self) -> PointValue {
        match self {
            Self::Baseline(snapshot) | Self::Unchanged(snapshot) => snapshot.value,
            Self::Changed { current, .. } => current.value,
        }
    }

    /// Returns the event to publish for this transition, if any.
    ///
    /// Unchanged readings produce no event.
    #[must_use]
    pub fn to_event(&self) -> Option<MonitorEvent> {
        match *self {
            Self::Baseline(snapshot) => Some(MonitorEvent::Baseline { snapshot }),
            Self::Changed { previous, current } => {
                Some(MonitorEvent::ValueChanged { previous, current })
            }
            Self::Unchanged(_) => None,
        }
    }
}

/// Holds the last successfully read value and detects transitions.
///
/// The tracker only ever moves forward on a successful, decodable reading.
/// A reading that fails to normalize leaves the stored value untouched.
///
/// Watchers are woken on the baseline and on every change; unchanged
/// readings refresh the stored timestamp without waking them.
///
/// # Examples
///
/// ```
/// use plc_monitor::state::{StateTracker, Transition};
/// use plc_monitor::transport::RawReading;
///
/// let mut tracker = StateTracker::new();
///
/// let first = tracker.update(&RawReading::Bits(vec![false])).unwrap();
/// assert!(matches!(first, Transition::Baseline(_)));
///
/// let second = tracker.update(&RawReading::Bits(vec![true])).unwrap();
/// assert!(second.changed());
/// ```
#[derive(Debug)]
pub struct StateTracker {
    tx: watch::Sender<Option<PointSnapshot>>,
}

impl StateTracker {
    /// Creates a tracker with no value yet.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Maps a raw transport reading to a [`PointValue`].
    ///
    /// Bit readings yield the first bit as [`PointValue::Bool`], register
    /// readings the first word as [`PointValue::Int`].
    ///
    /// # Errors
    ///
    /// Returns [`ReadingError::Empty`] if the reading carries no data.
    pub fn normalize(raw: &RawReading) -> Result<PointValue, ReadingError> {
        match raw {
            RawReading::Bits(bits) => bits
                .first()
                .copied()
                .map(PointValue::Bool)
                .ok_or(ReadingError::Empty),
            RawReading::Registers(words) => words
                .first()
                .map(|word| PointValue::Int(i64::from(*word)))
                .ok_or(ReadingError::Empty),
            RawReading::Value(value) => Ok(*value),
        }
    }

    /// Normalizes a reading and records it.
    ///
    /// # Errors
    ///
    /// Returns [`ReadingError`] if the reading cannot be normalized; the
    /// tracked value is unchanged in that case.
    pub fn update(&mut self, raw: &RawReading) -> Result<Transition, ReadingError> {
        let value = Self::normalize(raw)?;
        Ok(self.record(value))
    }

    /// Records an already normalized value.
    ///
    /// Values are compared with [`PointValue::same_as`], so a float that
    /// stays NaN is unchanged.
    pub fn record(&mut self, value: PointValue) -> Transition {
        let snapshot = PointSnapshot::now(value);
        let mut transition = Transition::Baseline(snapshot);

        self.tx.send_if_modified(|current| {
            transition = match current.as_ref() {
                None => Transition::Baseline(snapshot),
                Some(previous) if previous.value.same_as(&value) => {
                    Transition::Unchanged(snapshot)
                }
                Some(previous) => Transition::Changed {
                    previous: previous.value,
                    current: snapshot,
                },
            };
            *current = Some(snapshot);
            !matches!(transition, Transition::Unchanged(_))
        });

        transition
    }

    /// Returns the last successfully read value.
    #[must_use]
    pub fn value(&self) -> Option<PointValue> {
        self.snapshot().map(|s| s.value)
    }

    /// Returns the last snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<PointSnapshot> {
        *self.tx.borrow()
    }

    /// Creates a receiver that observes baselines and changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<PointSnapshot>> {
        self.tx.subscribe()
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}
