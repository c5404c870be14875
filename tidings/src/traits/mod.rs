//! Capability traits shared by clients, families and hubs.
//!
//! # Key Traits
//!
//! *   [`Delegate`]: An object exposing a message agent and an event agent, reported as the
//!     recipient of whatever those agents deliver. Families hold their members through it.
//! *   [`EventData`]: Converts the value passed to a broadcast into the event's
//!     [`Payload`](crate::message::Payload).

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
pub use delegate::{Delegate, MemberKey};
pub use event_data::EventData;

// --- Submodules ---

/// Defines the [`Delegate`] trait and [`MemberKey`].
mod delegate;
/// Defines the [`EventData`] conversion trait.
mod event_data;
