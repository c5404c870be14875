//! Core components of the broker.
//!
//! # Key Components
//!
//! *   [`TidingsApp`]: The entry point; loads configuration and creates a registry.
//! *   [`HubRegistry`]: Owns every hub, including the lazily created default hub.
//! *   [`Hub`]: An isolated broadcast domain routing event kinds to event agents.
//! *   [`Family`]: A group of members whose subscriptions cascade from the family.
//! *   [`Client`]: One connected peer, pairing a message agent with an event agent.
//! *   [`TidingsConfig`]: XDG/TOML configuration.
//! *   [`Diagnostics`]: The stream of warnings and errors raised by background work.
//! *   [`TidingsError`]: Every failure the broker reports.

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
pub use app::TidingsApp;
pub use client::Client;
pub use config::TidingsConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{DuplicateHubId, TidingsError, TidingsResult};
pub use family::Family;
pub use hub::{Hub, HubStats};
pub use registry::HubRegistry;
pub use types::{AgentId, HandlerId};

// --- Submodules ---

/// Defines identifiers and shared constants.
pub(crate) mod types;

/// Defines the `TidingsApp` entry point.
mod app;
/// Defines [`Client`].
mod client;
/// Defines the configuration system for Tidings.
pub mod config;
/// Defines the diagnostics stream.
mod diagnostics;
/// Defines [`TidingsError`] and [`DuplicateHubId`].
mod error;
/// Defines [`Family`] and its subscription cascade.
mod family;
/// Defines [`Hub`].
mod hub;
/// Defines [`HubRegistry`].
pub(crate) mod registry;
/// Kind-keyed handler sets.
pub(crate) mod subscriptions;
