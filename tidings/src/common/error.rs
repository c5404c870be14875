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

use std::fmt;

use crate::common::Hub;

/// Result alias used throughout the crate.
pub type TidingsResult<T> = Result<T, TidingsError>;

/// Represents every failure the broker can report.
///
/// Synchronous paths (configuration, hub construction, connection upgrade) return
/// these directly. Failures inside background tasks travel over the
/// [`Diagnostics`](crate::common::Diagnostics) stream instead, which is why the
/// type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TidingsError {
    /// A hub with the requested id is already registered.
    DuplicateHubId(String),
    /// A family and a client belong to different hubs.
    HubMismatch,
    /// The same handler was registered twice under one kind.
    DuplicateHandler,
    /// The delegate is already a member of the family.
    DuplicateDelegate,
    /// The delegate is not a member of the family.
    NoDelegates,
    /// A frame could not be turned into a message.
    UnparseableMessage(String),
    /// The frame type is not one that can be pushed.
    BadMessageType(u8),
    /// The requested operation has no implementation.
    NotYetImplemented(String),
    /// The ping period must be strictly shorter than the pong timeout.
    IllegalPingTimeout,
    /// The connection upgrade was refused or failed.
    UpgradeFailed(String),
    /// The connection upgrade did not finish in time.
    HandshakeTimeout,
    /// No frame arrived before the read deadline.
    ReadTimeout,
    /// An inbound frame exceeded the read limit.
    ReadLimitExceeded {
        /// Size of the offending frame in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
    /// A write did not complete before its deadline.
    WriteTimeout,
    /// The underlying transport failed.
    Transport(String),
    /// The connection is no longer open.
    ConnectionClosed,
    /// Nothing is subscribed to the given kind.
    NoSubscribers(String),
    /// An event agent's inbound queue closed.
    EventChannelClosed,
    /// An event of the given kind was dropped because its queue was full.
    QueueFull(String),
    /// A configuration value was rejected.
    InvalidConfig(String),
}

impl fmt::Display for TidingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TidingsError::DuplicateHubId(id) => write!(f, "a hub with id '{id}' already exists"),
            TidingsError::HubMismatch => write!(f, "family and client belong to different hubs"),
            TidingsError::DuplicateHandler => write!(f, "handler is already registered for this kind"),
            TidingsError::DuplicateDelegate => write!(f, "delegate is already a member of the family"),
            TidingsError::NoDelegates => write!(f, "delegate is not a member of the family"),
            TidingsError::UnparseableMessage(reason) => write!(f, "unparseable message: {reason}"),
            TidingsError::BadMessageType(code) => write!(f, "bad message type: {code}"),
            TidingsError::NotYetImplemented(what) => write!(f, "not yet implemented: {what}"),
            TidingsError::IllegalPingTimeout => {
                write!(f, "ping period must be shorter than the pong timeout")
            }
            TidingsError::UpgradeFailed(reason) => write!(f, "connection upgrade failed: {reason}"),
            TidingsError::HandshakeTimeout => write!(f, "connection upgrade timed out"),
            TidingsError::ReadTimeout => write!(f, "read deadline exceeded"),
            TidingsError::ReadLimitExceeded { size, limit } => {
                write!(f, "frame of {size} bytes exceeds the read limit of {limit} bytes")
            }
            TidingsError::WriteTimeout => write!(f, "write deadline exceeded"),
            TidingsError::Transport(reason) => write!(f, "transport error: {reason}"),
            TidingsError::ConnectionClosed => write!(f, "connection is closed"),
            TidingsError::NoSubscribers(kind) => write!(f, "no subscribers for '{kind}'"),
            TidingsError::EventChannelClosed => write!(f, "event channel closed"),
            TidingsError::QueueFull(kind) => {
                write!(f, "event '{kind}' dropped: dispatching queue is full")
            }
            TidingsError::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for TidingsError {}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TidingsError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        TidingsError::ConnectionClosed
    }
}

/// Returned by [`HubRegistry::new_hub`](crate::common::HubRegistry::new_hub) when the id is taken.
///
/// The already registered hub travels with the error so callers may carry on with it.
#[derive(Debug, Clone)]
pub struct DuplicateHubId {
    /// The id that was requested.
    pub id: String,
    /// The hub already registered under `id`.
    pub existing: Hub,
}

impl DuplicateHubId {
    /// Consumes the error and returns the existing hub.
    pub fn into_existing(self) -> Hub {
        self.existing
    }
}

impl fmt::Display for DuplicateHubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a hub with id '{}' already exists", self.id)
    }
}

impl std::error::Error for DuplicateHubId {}

impl From<DuplicateHubId> for TidingsError {
    fn from(err: DuplicateHubId) -> Self {
        TidingsError::DuplicateHubId(err.id)
    }
}
