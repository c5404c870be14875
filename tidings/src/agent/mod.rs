//! The two agents every client is built from.
//!
//! *   [`MessageAgent`]: Owns one connection. Its read task parses inbound frames and
//!     dispatches them by kind; its write task serialises outbound frames and keepalive pings.
//! *   [`EventAgent`]: Owns a bounded event queue fed by its hub and a lazily started
//!     dispatch task that runs the handlers registered for each event kind.

/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use crate::common::AgentId;

// --- Public Re-exports ---
pub use event_agent::EventAgent;
pub use message_agent::{ConnectionState, MessageAgent};

// --- Submodules ---

/// Defines [`EventAgent`].
mod event_agent;
/// Defines [`MessageAgent`] and its connection pipeline.
mod message_agent;

tokio::task_local! {
    /// The event agent whose dispatch task is running the current handler.
    ///
    /// Hub broadcasts consult it so a handler that re-triggers an event for its own
    /// agent never waits on the queue it is draining.
    pub(crate) static DISPATCHING: AgentId;
}

/// Returns the event agent currently dispatching on this task, if any.
pub(crate) fn dispatching_agent() -> Option<AgentId> {
    DISPATCHING.try_with(|id| *id).ok()
}
