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

//! WebSocket transport over `tokio-tungstenite`.
//!
//! ```rust,ignore
//! let (stream, _) = listener.accept().await?;
//! let client = hub.new_client("peer", WsUpgrade::new(stream)).await?;
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::trace;

use crate::common::{TidingsError, TidingsResult};
use crate::transport::{
    CloseReason, Connection, ConnectionSettings, Frame, FrameSink, FrameSource, Upgrade,
};

/// Server-side WebSocket handshake over any byte stream.
#[derive(Debug)]
pub struct WsUpgrade<S> {
    stream: S,
}

impl<S> WsUpgrade<S> {
    /// Wraps an accepted stream that still has to complete the handshake.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

fn websocket_config(settings: &ConnectionSettings) -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    if settings.read_buffer_size > 0 {
        config.read_buffer_size = settings.read_buffer_size;
    }
    if settings.write_buffer_size > 0 {
        config.write_buffer_size = settings.write_buffer_size;
    }
    config.max_message_size = Some(settings.read_limit);
    config.max_frame_size = Some(settings.read_limit);
    config
}

#[async_trait]
impl<S> Upgrade for WsUpgrade<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Connection = WsConnection<S>;

    async fn upgrade(self, settings: &ConnectionSettings) -> TidingsResult<WsConnection<S>> {
        let config = websocket_config(settings);
        let stream = tokio_tungstenite::accept_async_with_config(self.stream, Some(config))
            .await
            .map_err(|e| TidingsError::UpgradeFailed(e.to_string()))?;
        trace!("websocket handshake complete");
        Ok(WsConnection { stream })
    }
}

/// Adopts a stream whose handshake was already done elsewhere.
#[derive(Debug)]
pub struct WsAccepted<S> {
    stream: WebSocketStream<S>,
}

impl<S> WsAccepted<S> {
    /// Wraps an upgraded stream.
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> Upgrade for WsAccepted<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Connection = WsConnection<S>;

    async fn upgrade(self, _settings: &ConnectionSettings) -> TidingsResult<WsConnection<S>> {
        Ok(WsConnection {
            stream: self.stream,
        })
    }
}

/// An upgraded WebSocket connection.
#[derive(Debug)]
pub struct WsConnection<S> {
    stream: WebSocketStream<S>,
}

impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Source = WsSource<S>;
    type Sink = WsSink<S>;

    fn split(self) -> (WsSource<S>, WsSink<S>) {
        let (sink, stream) = self.stream.split();
        (WsSource { stream }, WsSink { sink })
    }
}

/// Read half of a [`WsConnection`].
#[derive(Debug)]
pub struct WsSource<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameSource for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> Option<TidingsResult<Frame>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TidingsError::Transport(e.to_string()))),
            };
            let frame = match message {
                Message::Text(text) => {
                    Frame::Text(Bytes::copy_from_slice(text.as_str().as_bytes()))
                }
                Message::Binary(data) => Frame::Binary(data),
                Message::Ping(data) => Frame::Ping(data),
                Message::Pong(data) => Frame::Pong(data),
                Message::Close(close) => Frame::Close(close.map(|c| CloseReason {
                    code: c.code.into(),
                    reason: c.reason.as_str().to_string(),
                })),
                Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }
}

/// Write half of a [`WsConnection`].
#[derive(Debug)]
pub struct WsSink<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

fn to_message(frame: Frame) -> TidingsResult<Message> {
    Ok(match frame {
        Frame::Text(data) => {
            let text = String::from_utf8(data.to_vec())
                .map_err(|e| TidingsError::Transport(e.to_string()))?;
            Message::text(text)
        }
        Frame::Binary(data) => Message::Binary(data),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close(None) => Message::Close(None),
        Frame::Close(Some(reason)) => Message::Close(Some(CloseFrame {
            code: CloseCode::from(reason.code),
            reason: reason.reason.into(),
        })),
    })
}

#[async_trait]
impl<S> FrameSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_frame(&mut self, frame: Frame) -> TidingsResult<()> {
        let message = to_message(frame)?;
        self.sink
            .send(message)
            .await
            .map_err(|e| TidingsError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> TidingsResult<()> {
        self.sink
            .close()
            .await
            .map_err(|e| TidingsError::Transport(e.to_string()))
    }
}
