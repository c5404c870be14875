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

use bytes::Bytes;

use crate::agent::MessageAgent;
use crate::message::{Payload, Recipient};

/// The result of parsing one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    /// Kind used to pick the handlers.
    pub kind: String,
    /// Decoded content.
    pub data: Payload,
    /// The frame payload as received.
    pub raw: Bytes,
}

/// An inbound message as seen by a message handler.
#[derive(Debug, Clone)]
pub struct Message {
    parsed: ParsedMessage,
    recipient: Recipient,
    source: MessageAgent,
}

impl Message {
    pub(crate) fn new(parsed: ParsedMessage, recipient: Recipient, source: MessageAgent) -> Self {
        Self {
            parsed,
            recipient,
            source,
        }
    }

    /// The message kind.
    pub fn kind(&self) -> &str {
        &self.parsed.kind
    }

    /// The decoded content.
    pub fn data(&self) -> &Payload {
        &self.parsed.data
    }

    /// The frame payload as received.
    pub fn raw(&self) -> &Bytes {
        &self.parsed.raw
    }

    /// The receiving agent's delegate, or the agent itself.
    pub fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    /// The message agent the frame arrived on. Reply through it.
    pub fn source(&self) -> &MessageAgent {
        &self.source
    }
}
