// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll scheduling and cycle status.
//!
//! The [`PollScheduler`] drives one read cycle per poll interval. Each cycle
//! ends in a [`PollStatus`], published on a `watch` channel:
//!
//! | Outcome | Status |
//! |---------|--------|
//! | point read | `"<label> state: <value>"` |
//! | no session | `"PLC not connected"` |
//! | read or decode failure | `"Error: <message>"` |

mod poll_status;
mod scheduler;

pub use poll_status::PollStatus;
pub use scheduler::PollScheduler;
pub(crate) use scheduler::spawn;
