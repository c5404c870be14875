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

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::common::subscriptions::{Registration, Removal, Subscriptions};
use crate::common::types::next_family_id;
use crate::common::{Hub, TidingsError, TidingsResult};
use crate::message::{Event, EventHandler, Message, MessageHandler};
use crate::traits::{Delegate, MemberKey};
use crate::transport::MessageType;

/// A named group of delegates sharing subscriptions.
///
/// Handlers registered on a family are registered on every current member and
/// on every member that joins later; they are taken back from a member when it
/// leaves or when the family unsubscribes them. A member keeps a handler that
/// two of its families share until it has left both.
///
/// Cloning a `Family` yields another handle to the same family.
#[derive(Clone)]
pub struct Family {
    inner: Arc<FamilyInner>,
}

struct FamilyInner {
    id: String,
    hub: Hub,
    state: Mutex<FamilyState>,
}

#[derive(Default)]
struct FamilyState {
    members: HashMap<MemberKey, Arc<dyn Delegate>>,
    messages: Subscriptions<Message>,
    events: Subscriptions<Event>,
}

impl FamilyState {
    fn grant(&self, member: &dyn Delegate) {
        for (kind, handler) in self.messages.entries() {
            member.message_agent().hold(&kind, handler);
        }
        for (kind, handler) in self.events.entries() {
            member.event_agent().hold(&kind, handler);
        }
    }

    fn revoke(&self, member: &dyn Delegate) {
        for (kind, handler) in self.messages.entries() {
            member.message_agent().release(&kind, handler.id());
        }
        for (kind, handler) in self.events.entries() {
            member.event_agent().release(&kind, handler.id());
        }
    }
}

impl Family {
    pub(crate) fn new(hub: Hub) -> Self {
        let family = Self {
            inner: Arc::new(FamilyInner {
                id: next_family_id(),
                hub,
                state: Mutex::new(FamilyState::default()),
            }),
        };
        trace!(family = family.id(), hub = family.hub().id(), "family created");
        family
    }

    /// This family's id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The hub this family belongs to.
    pub fn hub(&self) -> &Hub {
        &self.inner.hub
    }

    /// Adds `member` and grants it every handler the family holds.
    ///
    /// Adding a current member reports a [`TidingsError::DuplicateDelegate`]
    /// warning and changes nothing.
    ///
    /// # Errors
    ///
    /// [`TidingsError::HubMismatch`] when the member's agents belong to another hub.
    ///
    /// # Panics
    ///
    /// When a member's event dispatch task has to be started outside a Tokio runtime.
    pub fn add(&self, member: Arc<dyn Delegate>) -> TidingsResult<()> {
        if member.event_agent().hub() != self.hub() || member.message_agent().hub() != self.hub() {
            return Err(TidingsError::HubMismatch);
        }
        let key = member.member_key();
        let mut state = self.inner.state.lock();
        if state.members.contains_key(&key) {
            drop(state);
            self.inner.hub.diagnostics().warn(TidingsError::DuplicateDelegate);
            return Ok(());
        }
        state.grant(member.as_ref());
        debug!(family = self.id(), member = member.delegate_id(), "member joined");
        state.members.insert(key, member);
        Ok(())
    }

    /// Removes `member` and takes back every handler the family granted it.
    ///
    /// Removing a non-member reports a [`TidingsError::NoDelegates`] warning.
    pub fn remove(&self, member: &dyn Delegate) {
        let mut state = self.inner.state.lock();
        match state.members.remove(&member.member_key()) {
            Some(removed) => {
                state.revoke(removed.as_ref());
                debug!(family = self.id(), member = removed.delegate_id(), "member left");
            }
            None => {
                drop(state);
                self.inner.hub.diagnostics().warn(TidingsError::NoDelegates);
            }
        }
    }

    /// `true` if `member` currently belongs to this family.
    pub fn has_member(&self, member: &dyn Delegate) -> bool {
        self.inner.state.lock().members.contains_key(&member.member_key())
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.state.lock().members.len()
    }

    /// `true` when the family has no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delegate ids of every member, sorted.
    pub fn member_ids(&self) -> Vec<String> {
        let state = self.inner.state.lock();
        let mut ids: Vec<String> = state
            .members
            .values()
            .map(|m| m.delegate_id().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// Registers `handler` for inbound messages of `kind` on the family and on every member.
    pub fn subscribe_message(&self, kind: &str, handler: MessageHandler) {
        let mut state = self.inner.state.lock();
        if state.messages.subscribe(kind, handler.clone()) == Registration::Duplicate {
            drop(state);
            self.inner.hub.diagnostics().warn(TidingsError::DuplicateHandler);
            return;
        }
        for member in state.members.values() {
            member.message_agent().hold(kind, handler.clone());
        }
    }

    /// Takes `handler` for `kind` back from the family and from every member.
    pub fn unsubscribe_message(&self, kind: &str, handler: &MessageHandler) {
        let mut state = self.inner.state.lock();
        if let Removal::Removed { .. } = state.messages.unsubscribe(kind, handler.id()) {
            for member in state.members.values() {
                member.message_agent().release(kind, handler.id());
            }
        }
    }

    /// Registers `handler` for events of `kind` on the family and on every member.
    ///
    /// # Panics
    ///
    /// When a member's event dispatch task has to be started outside a Tokio runtime.
    pub fn subscribe_event(&self, kind: &str, handler: EventHandler) {
        let mut state = self.inner.state.lock();
        if state.events.subscribe(kind, handler.clone()) == Registration::Duplicate {
            drop(state);
            self.inner.hub.diagnostics().warn(TidingsError::DuplicateHandler);
            return;
        }
        for member in state.members.values() {
            member.event_agent().hold(kind, handler.clone());
        }
    }

    /// Takes `handler` for `kind` back from the family and from every member.
    pub fn unsubscribe_event(&self, kind: &str, handler: &EventHandler) {
        let mut state = self.inner.state.lock();
        if let Removal::Removed { .. } = state.events.unsubscribe(kind, handler.id()) {
            for member in state.members.values() {
                member.event_agent().release(kind, handler.id());
            }
        }
    }

    /// Queues `payload` on every member's connection.
    ///
    /// A member whose connection refuses the frame is reported on the
    /// diagnostics stream and skipped.
    ///
    /// # Errors
    ///
    /// [`TidingsError::BadMessageType`] for anything but text and binary.
    pub async fn push_message(
        &self,
        payload: impl Into<Bytes>,
        message_type: MessageType,
    ) -> TidingsResult<()> {
        if !message_type.is_data() {
            return Err(TidingsError::BadMessageType(message_type.into()));
        }
        let payload = payload.into();
        let agents: Vec<_> = {
            let state = self.inner.state.lock();
            state
                .members
                .values()
                .map(|m| m.message_agent().clone())
                .collect()
        };
        for agent in agents {
            if let Err(error) = agent.push_message(payload.clone(), message_type).await {
                self.inner.hub.diagnostics().warn(error);
            }
        }
        Ok(())
    }
}

impl PartialEq for Family {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Family {}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Family")
            .field("id", &self.inner.id)
            .field("hub", &self.inner.hub.id())
            .field("members", &self.len())
            .finish()
    }
}
