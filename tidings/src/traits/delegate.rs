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

use crate::agent::{EventAgent, MessageAgent};
use crate::common::AgentId;

/// Something that owns a message agent and an event agent and can stand in as
/// the recipient of what they deliver.
///
/// [`Client`](crate::common::Client) is the stock implementation. Families hold
/// their members as `Arc<dyn Delegate>`.
pub trait Delegate: Send + Sync + 'static {
    /// Identity reported as the recipient of dispatched events and messages.
    fn delegate_id(&self) -> &str;

    /// The connection pipeline of this delegate.
    fn message_agent(&self) -> &MessageAgent;

    /// The event listener of this delegate.
    fn event_agent(&self) -> &EventAgent;

    /// Key under which families record this delegate.
    fn member_key(&self) -> MemberKey {
        MemberKey {
            event_agent: self.event_agent().id(),
            message_agent: self.message_agent().id(),
        }
    }
}

impl fmt::Debug for dyn Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("id", &self.delegate_id())
            .field("key", &self.member_key())
            .finish()
    }
}

/// Identifies a family member by the pair of agents it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKey {
    /// Id of the member's event agent.
    pub event_agent: AgentId,
    /// Id of the member's message agent.
    pub message_agent: AgentId,
}
