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

//! An in-memory transport.
//!
//! [`pair`] returns the server side, an [`Upgrade`] to hand to a hub, together
//! with the [`Peer`] that plays the remote end. Tests drive connections through
//! it, and embedders can use it to bridge agents that live in the same process.
//! The peer does not answer pings on its own; call [`Peer::pong`] to keep the
//! connection alive.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

use crate::common::types::DEFAULT_QUEUE_CAPACITY;
use crate::common::{TidingsError, TidingsResult};
use crate::transport::{Connection, ConnectionSettings, Frame, FrameSink, FrameSource, Upgrade};

/// Creates a connected upgrade/peer pair with the default buffer capacity.
pub fn pair() -> (ChannelUpgrade, Peer) {
    pair_with_capacity(DEFAULT_QUEUE_CAPACITY)
}

/// Creates a connected upgrade/peer pair buffering up to `capacity` frames per direction.
pub fn pair_with_capacity(capacity: usize) -> (ChannelUpgrade, Peer) {
    let (to_server, from_peer) = mpsc::channel(capacity.max(1));
    let (to_peer, from_server) = mpsc::channel(capacity.max(1));
    let upgrade = ChannelUpgrade {
        outcome: Ok(ChannelConnection {
            source: ChannelSource { inbound: from_peer },
            sink: ChannelSink {
                outbound: Some(to_peer),
            },
        }),
    };
    let peer = Peer {
        outbound: to_server,
        inbound: from_server,
    };
    (upgrade, peer)
}

/// Server side of an in-memory connection, not yet upgraded.
#[derive(Debug)]
pub struct ChannelUpgrade {
    outcome: Result<ChannelConnection, String>,
}

impl ChannelUpgrade {
    /// An upgrade whose handshake always fails with `reason`.
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
        }
    }
}

#[async_trait]
impl Upgrade for ChannelUpgrade {
    type Connection = ChannelConnection;

    async fn upgrade(self, _settings: &ConnectionSettings) -> TidingsResult<ChannelConnection> {
        self.outcome.map_err(TidingsError::UpgradeFailed)
    }
}

/// Server side of an upgraded in-memory connection.
#[derive(Debug)]
pub struct ChannelConnection {
    source: ChannelSource,
    sink: ChannelSink,
}

impl Connection for ChannelConnection {
    type Source = ChannelSource;
    type Sink = ChannelSink;

    fn split(self) -> (ChannelSource, ChannelSink) {
        (self.source, self.sink)
    }
}

/// Read half of a [`ChannelConnection`].
#[derive(Debug)]
pub struct ChannelSource {
    inbound: mpsc::Receiver<Frame>,
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Option<TidingsResult<Frame>> {
        self.inbound.recv().await.map(Ok)
    }
}

/// Write half of a [`ChannelConnection`].
#[derive(Debug)]
pub struct ChannelSink {
    outbound: Option<mpsc::Sender<Frame>>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_frame(&mut self, frame: Frame) -> TidingsResult<()> {
        let outbound = self.outbound.as_ref().ok_or(TidingsError::ConnectionClosed)?;
        outbound
            .send(frame)
            .await
            .map_err(|_| TidingsError::Transport("peer hung up".into()))
    }

    async fn close(&mut self) -> TidingsResult<()> {
        trace!("closing channel sink");
        self.outbound.take();
        Ok(())
    }
}

/// The remote end of an in-memory connection.
#[derive(Debug)]
pub struct Peer {
    outbound: mpsc::Sender<Frame>,
    inbound: mpsc::Receiver<Frame>,
}

impl Peer {
    /// Sends a frame to the server side.
    ///
    /// # Errors
    ///
    /// [`TidingsError::ConnectionClosed`] once the server stopped reading.
    pub async fn send(&self, frame: Frame) -> TidingsResult<()> {
        Ok(self.outbound.send(frame).await?)
    }

    /// Sends a text frame.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn send_text(&self, text: impl Into<Bytes>) -> TidingsResult<()> {
        self.send(Frame::Text(text.into())).await
    }

    /// Sends a binary frame.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn send_binary(&self, data: impl Into<Bytes>) -> TidingsResult<()> {
        self.send(Frame::Binary(data.into())).await
    }

    /// Answers a keepalive ping.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn pong(&self) -> TidingsResult<()> {
        self.send(Frame::Pong(Bytes::new())).await
    }

    /// Sends a close frame.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn close(&self) -> TidingsResult<()> {
        self.send(Frame::Close(None)).await
    }

    /// Waits for the next frame from the server. `None` once the server closed its side.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.inbound.recv().await
    }

    /// Waits for the next frame that is not a ping or a pong.
    pub async fn recv_data(&mut self) -> Option<Frame> {
        loop {
            match self.inbound.recv().await? {
                Frame::Ping(_) | Frame::Pong(_) => continue,
                frame => return Some(frame),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_in_both_directions() {
        let (upgrade, mut peer) = pair();
        let connection = upgrade.upgrade(&ConnectionSettings::default()).await.unwrap();
        let (mut source, mut sink) = connection.split();

        peer.send_text("hi").await.unwrap();
        assert_eq!(
            source.next_frame().await.unwrap().unwrap(),
            Frame::Text(Bytes::from_static(b"hi"))
        );

        sink.send_frame(Frame::Ping(Bytes::new())).await.unwrap();
        sink.send_frame(Frame::Binary(Bytes::from_static(b"\x01"))).await.unwrap();
        assert_eq!(
            peer.recv_data().await,
            Some(Frame::Binary(Bytes::from_static(b"\x01")))
        );

        sink.close().await.unwrap();
        assert_eq!(peer.recv().await, None);
        assert_eq!(
            sink.send_frame(Frame::Text(Bytes::new())).await,
            Err(TidingsError::ConnectionClosed)
        );
    }

    #[tokio::test]
    async fn refused_upgrade_fails() {
        let result = ChannelUpgrade::refused("nope")
            .upgrade(&ConnectionSettings::default())
            .await;
        assert!(matches!(result, Err(TidingsError::UpgradeFailed(reason)) if reason == "nope"));
    }
}
