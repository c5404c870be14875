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

use std::sync::Arc;

use crate::message::{Payload, Recipient};
use crate::traits::Delegate;

/// A named occurrence broadcast through a hub.
///
/// Publishers set the kind, data and source. The dispatching event agent fills in
/// the recipient just before handlers run.
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    data: Option<Payload>,
    recipient: Option<Recipient>,
    source: Option<Arc<dyn Delegate>>,
}

impl Event {
    pub(crate) fn new(
        kind: impl Into<String>,
        data: Option<Payload>,
        source: Option<Arc<dyn Delegate>>,
    ) -> Self {
        Self {
            kind: kind.into(),
            data,
            recipient: None,
            source,
        }
    }

    pub(crate) fn with_recipient(mut self, recipient: Recipient) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// The event kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The published data, if any.
    pub fn data(&self) -> Option<&Payload> {
        self.data.as_ref()
    }

    /// Who is receiving this event. Always set inside a handler.
    pub fn recipient(&self) -> Option<&Recipient> {
        self.recipient.as_ref()
    }

    /// The client that triggered the event, if it came from one.
    pub fn source(&self) -> Option<&Arc<dyn Delegate>> {
        self.source.as_ref()
    }
}
