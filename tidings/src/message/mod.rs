//! Events, inbound messages and the values they carry.
//!
//! # Key Components
//!
//! *   [`Event`]: A kind-tagged occurrence broadcast through a hub.
//! *   [`Message`]: A parsed inbound frame delivered to message handlers.
//! *   [`Payload`]: The closed set of data shapes events and messages carry.
//! *   [`Handler`]: A callback with a stable identity, used for de-duplication.
//! *   [`MessageParser`] and [`JsonParser`]: Pluggable frame parsing.
//! *   [`Recipient`]: Who a delivery is addressed to.

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

// --- Public Re-exports ---
pub use event::Event;
pub use handler::{EventHandler, Handler, MessageHandler};
pub use inbound::{Message, ParsedMessage};
pub use parser::{JsonParser, MessageParser};
pub use payload::Payload;
pub use recipient::Recipient;

// --- Submodules ---

/// Defines [`Event`].
mod event;
/// Defines [`Handler`] and its aliases.
mod handler;
/// Defines [`Message`] and [`ParsedMessage`].
mod inbound;
/// Defines the parser plugin contract and the JSON parser.
mod parser;
/// Defines [`Payload`].
mod payload;
/// Defines [`Recipient`].
mod recipient;
