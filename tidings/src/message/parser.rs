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

use crate::common::{TidingsError, TidingsResult};
use crate::message::{ParsedMessage, Payload};

/// Turns raw frame payloads into kind-tagged messages.
///
/// Install a custom parser with
/// [`MessageAgent::set_parser`](crate::agent::MessageAgent::set_parser) to use a
/// wire format other than JSON.
pub trait MessageParser: Send + Sync + 'static {
    /// Parses the payload of a text frame.
    fn parse_text(&self, raw: Bytes) -> TidingsResult<ParsedMessage>;

    /// Parses the payload of a binary frame.
    fn parse_binary(&self, raw: Bytes) -> TidingsResult<ParsedMessage> {
        let _ = raw;
        Err(TidingsError::NotYetImplemented("binary message parsing".into()))
    }
}

/// The default parser.
///
/// Text frames must hold a JSON object with a string `kind` field, or failing
/// that a string `name` field. The whole object becomes the message data.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl MessageParser for JsonParser {
    fn parse_text(&self, raw: Bytes) -> TidingsResult<ParsedMessage> {
        let value: Value = serde_json::from_slice(&raw)
            .map_err(|e| TidingsError::UnparseableMessage(e.to_string()))?;
        let Value::Object(fields) = &value else {
            return Err(TidingsError::UnparseableMessage(
                "expected a JSON object".into(),
            ));
        };
        let kind = ["kind", "name"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .ok_or_else(|| TidingsError::UnparseableMessage("missing kind field".into()))?
            .to_string();
        Ok(ParsedMessage {
            kind,
            data: Payload::Json(value),
            raw,
        })
    }
}
