// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection state of the device session.

use std::fmt;

use serde::Serialize;

/// Connection state owned by the
/// [`ConnectionManager`](super::ConnectionManager).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    /// No session is open.
    #[default]
    Disconnected,
    /// A session is being opened.
    Connecting,
    /// A session is open and reads may be issued.
    Connected,
}

impl ConnectionState {
    /// Returns true if a session is open.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}
