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

use bytes::Bytes;

use crate::common::TidingsError;

/// Frame opcodes, numbered as in WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// A UTF-8 text frame.
    Text = 1,
    /// A binary frame.
    Binary = 2,
    /// A close control frame.
    Close = 8,
    /// A ping control frame.
    Ping = 9,
    /// A pong control frame.
    Pong = 10,
}

impl MessageType {
    /// `true` for the frame types applications may push.
    pub fn is_data(self) -> bool {
        matches!(self, MessageType::Text | MessageType::Binary)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = TidingsError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(MessageType::Text),
            2 => Ok(MessageType::Binary),
            8 => Ok(MessageType::Close),
            9 => Ok(MessageType::Ping),
            10 => Ok(MessageType::Pong),
            other => Err(TidingsError::BadMessageType(other)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value as u8
    }
}

/// Status code and reason sent with a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// Close status code.
    pub code: u16,
    /// Human readable reason.
    pub reason: String,
}

/// One unit of traffic on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload.
    Text(Bytes),
    /// Binary payload.
    Binary(Bytes),
    /// Keepalive request.
    Ping(Bytes),
    /// Keepalive answer.
    Pong(Bytes),
    /// Connection shutdown.
    Close(Option<CloseReason>),
}

impl Frame {
    /// The opcode of this frame.
    pub fn message_type(&self) -> MessageType {
        match self {
            Frame::Text(_) => MessageType::Text,
            Frame::Binary(_) => MessageType::Binary,
            Frame::Ping(_) => MessageType::Ping,
            Frame::Pong(_) => MessageType::Pong,
            Frame::Close(_) => MessageType::Close,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(b) | Frame::Binary(b) | Frame::Ping(b) | Frame::Pong(b) => b.len(),
            Frame::Close(reason) => reason.as_ref().map_or(0, |r| r.reason.len() + 2),
        }
    }

    /// `true` when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({} bytes)", self.message_type(), self.len())
    }
}
