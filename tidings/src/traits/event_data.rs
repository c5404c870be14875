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
use serde_json::Value;

use crate::message::Payload;

/// Turns a value handed to `broadcast` or `trigger` into event data.
///
/// Returning `None` publishes an event without data.
pub trait EventData {
    /// Converts `self` into the payload carried by the event.
    fn into_payload(self) -> Option<Payload>;
}

impl EventData for () {
    fn into_payload(self) -> Option<Payload> {
        None
    }
}

impl EventData for Payload {
    fn into_payload(self) -> Option<Payload> {
        Some(self)
    }
}

impl EventData for Option<Payload> {
    fn into_payload(self) -> Option<Payload> {
        self
    }
}

impl EventData for Value {
    fn into_payload(self) -> Option<Payload> {
        Some(Payload::Json(self))
    }
}

impl EventData for String {
    fn into_payload(self) -> Option<Payload> {
        Some(Payload::Text(self))
    }
}

impl EventData for &str {
    fn into_payload(self) -> Option<Payload> {
        Some(Payload::Text(self.to_string()))
    }
}

impl EventData for Bytes {
    fn into_payload(self) -> Option<Payload> {
        Some(Payload::Bytes(self))
    }
}
