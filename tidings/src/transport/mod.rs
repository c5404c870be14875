//! The boundary between the broker and the wire.
//!
//! A transport supplies an [`Upgrade`] that turns an accepted request into a
//! [`Connection`], which splits into a [`FrameSource`] read by the read task and a
//! [`FrameSink`] written by the write task. Deadlines are applied by the
//! connection pipeline, so transports only move frames.
//!
//! # Bundled Transports
//!
//! *   [`channel`]: An in-memory transport backed by Tokio channels.
//! *   `ws` (feature `ws`): WebSocket via `tokio-tungstenite`.

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

use std::time::Duration;

use async_trait::async_trait;

use crate::common::{TidingsConfig, TidingsResult};

// --- Public Re-exports ---
pub use frame::{CloseReason, Frame, MessageType};

// --- Submodules ---

/// Defines [`Frame`] and [`MessageType`].
mod frame;
/// In-memory transport.
pub mod channel;
/// WebSocket transport.
#[cfg(feature = "ws")]
pub mod ws;

/// Connection parameters captured from the registry configuration at upgrade time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Largest inbound frame accepted, in bytes.
    pub read_limit: usize,
    /// Transport read buffer size; 0 keeps the transport default.
    pub read_buffer_size: usize,
    /// Transport write buffer size; 0 keeps the transport default.
    pub write_buffer_size: usize,
    /// Deadline for the upgrade itself.
    pub handshake_timeout: Duration,
    /// Deadline for each outbound write.
    pub write_timeout: Duration,
    /// Read deadline extension granted by each pong.
    pub pong_timeout: Duration,
    /// Interval between keepalive pings.
    pub ping_period: Duration,
    /// Capacity of each outbound queue.
    pub queue_capacity: usize,
}

impl From<&TidingsConfig> for ConnectionSettings {
    fn from(config: &TidingsConfig) -> Self {
        Self {
            read_limit: config.limits.read_limit,
            read_buffer_size: config.limits.read_buffer_size,
            write_buffer_size: config.limits.write_buffer_size,
            handshake_timeout: config.handshake_timeout(),
            write_timeout: config.write_timeout(),
            pong_timeout: config.pong_timeout(),
            ping_period: config.ping_period(),
            queue_capacity: config.limits.queue_capacity,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&TidingsConfig::default())
    }
}

/// Performs the handshake that turns an accepted request into a connection.
#[async_trait]
pub trait Upgrade: Send + 'static {
    /// The connection produced on success.
    type Connection: Connection;

    /// Runs the handshake.
    ///
    /// # Errors
    ///
    /// [`TidingsError::UpgradeFailed`](crate::common::TidingsError::UpgradeFailed)
    /// when the peer is refused or the handshake breaks.
    async fn upgrade(self, settings: &ConnectionSettings) -> TidingsResult<Self::Connection>;
}

/// An established full-duplex connection.
pub trait Connection: Send + 'static {
    /// The read half.
    type Source: FrameSource;
    /// The write half.
    type Sink: FrameSink;

    /// Splits the connection so reads and writes can run on separate tasks.
    fn split(self) -> (Self::Source, Self::Sink);
}

/// The read half of a connection.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Waits for the next frame. `None` means the peer went away.
    async fn next_frame(&mut self) -> Option<TidingsResult<Frame>>;
}

/// The write half of a connection.
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Writes one frame.
    async fn send_frame(&mut self, frame: Frame) -> TidingsResult<()>;

    /// Flushes and closes the write half.
    async fn close(&mut self) -> TidingsResult<()>;
}
