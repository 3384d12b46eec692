// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle for the device session.
//!
//! The [`ConnectionManager`] owns the transport session and is the single
//! writer of [`ConnectionState`]. It connects on request, reconnects on a
//! fixed schedule after failures, and refuses reads while no session is open.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──ok──▶ Connected
//!      ▲                        │                  │
//!      └────────fail────────────┘                  │
//!      └──────────read failure / disconnect────────┘
//! ```
//!
//! Each failed connect schedules the next attempt after the connect retry
//! delay; each failed read discards the session and schedules a reconnect
//! after the read failure retry delay. Retries continue until shutdown.

mod connection_manager;
mod connection_state;

pub use connection_manager::ConnectionManager;
pub use connection_state::ConnectionState;
