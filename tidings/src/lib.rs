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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Tidings
//!
//! A real-time message and event broker for persistent, full-duplex client
//! connections, built on top of Tokio.
//!
//! ## Key Concepts
//!
//! - **Hubs (`Hub`)**: isolated broadcast domains. Events triggered inside a hub
//!   never reach another hub. Hubs live in a [`HubRegistry`](crate::common::HubRegistry)
//!   created by [`TidingsApp`](crate::common::TidingsApp).
//! - **Message Agents (`MessageAgent`)**: own one physical connection, run its read and
//!   write tasks, parse inbound frames into [`Message`](crate::message::Message)s and
//!   dispatch them by kind.
//! - **Event Agents (`EventAgent`)**: own a bounded event queue and a lazily started
//!   dispatch task that turns hub broadcasts into handler calls.
//! - **Clients (`Client`)**: one connected peer, pairing a message agent with an event agent.
//! - **Families (`Family`)**: named groups of clients whose subscriptions cascade to every
//!   current and future member.
//! - **Diagnostics**: background failures are never thrown across task boundaries; they are
//!   published on a [`Diagnostics`](crate::common::Diagnostics) stream and logged via `tracing`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tidings::prelude::*;
//!
//! let registry = TidingsApp::launch();
//! let hub = registry.default_hub();
//! let (upgrade, _peer) = tidings::transport::channel::pair();
//! let client = hub.new_client("c1", upgrade).await?;
//! client.on_event("ping", EventHandler::from_fn(|event| {
//!     println!("{} got {}", event.recipient().map(|r| r.id()).unwrap_or_default(), event.kind());
//! }));
//! client.trigger("ping", ()).await;
//! ```

/// Hub registry, hubs, families, clients, configuration and diagnostics.
pub mod common;

/// Per-connection message agents and per-entity event agents.
pub mod agent;

/// Events, messages, payloads, handlers and parsers.
pub mod message;

/// Capability traits shared across components.
pub mod traits;

/// Frame model, transport traits and bundled transports.
pub mod transport;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// *   [`crate::common::TidingsApp`]: Entry point that loads configuration and creates a registry.
/// *   [`crate::common::HubRegistry`]: Owner of every hub and of the default hub.
/// *   [`crate::common::Hub`], [`crate::common::Family`], [`crate::common::Client`].
/// *   [`crate::agent::MessageAgent`], [`crate::agent::EventAgent`].
/// *   [`crate::message::Event`], [`crate::message::Message`], [`crate::message::Payload`]
///     and the handler types.
/// *   [`crate::traits::Delegate`] and [`crate::traits::EventData`].
/// *   [`crate::transport::MessageType`] and the transport traits.
pub mod prelude {
    pub use async_trait::async_trait;
    pub use bytes::Bytes;

    pub use crate::agent::{ConnectionState, EventAgent, MessageAgent};
    pub use crate::common::{
        Client, Diagnostic, Diagnostics, DuplicateHubId, Family, Hub, HubRegistry, HubStats,
        Severity, TidingsApp, TidingsConfig, TidingsError, TidingsResult,
    };
    pub use crate::message::{
        EventHandler, Event, Handler, JsonParser, Message, MessageHandler, MessageParser,
        ParsedMessage, Payload, Recipient,
    };
    pub use crate::traits::{Delegate, EventData, MemberKey};
    pub use crate::transport::{
        Connection, ConnectionSettings, Frame, FrameSink, FrameSource, MessageType, Upgrade,
    };
}
