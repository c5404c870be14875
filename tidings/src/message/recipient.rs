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

use crate::agent::{EventAgent, MessageAgent};
use crate::traits::Delegate;

/// The apparent receiver of a dispatched event or message.
///
/// Agents report their delegate when one is set, and themselves otherwise.
#[derive(Debug, Clone)]
pub enum Recipient {
    /// The delegate standing in for the agent, usually a client.
    Delegate(Arc<dyn Delegate>),
    /// An event agent without a delegate.
    EventAgent(EventAgent),
    /// A message agent without a delegate.
    MessageAgent(MessageAgent),
}

impl Recipient {
    /// The delegate id, or the agent's label when there is no delegate.
    pub fn id(&self) -> String {
        match self {
            Recipient::Delegate(delegate) => delegate.delegate_id().to_string(),
            Recipient::EventAgent(agent) => agent.id().to_string(),
            Recipient::MessageAgent(agent) => agent.id().to_string(),
        }
    }

    /// The delegate, if the recipient is one.
    pub fn as_delegate(&self) -> Option<&Arc<dyn Delegate>> {
        match self {
            Recipient::Delegate(delegate) => Some(delegate),
            _ => None,
        }
    }
}
