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
use std::sync::{Arc, Weak};

use bytes::Bytes;
use tracing::debug;

use crate::agent::{ConnectionState, EventAgent, MessageAgent};
use crate::common::{Family, Hub, TidingsResult};
use crate::message::{EventHandler, MessageHandler, MessageParser};
use crate::traits::{Delegate, EventData};
use crate::transport::{MessageType, Upgrade};

/// One connected peer: a message agent and an event agent under one id.
///
/// The client is reported as the recipient of everything its agents deliver
/// and as the source of the events it triggers.
///
/// Cloning a `Client` yields another handle to the same client.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    id: String,
    hub: Hub,
    message_agent: MessageAgent,
    event_agent: EventAgent,
}

impl Delegate for ClientInner {
    fn delegate_id(&self) -> &str {
        &self.id
    }

    fn message_agent(&self) -> &MessageAgent {
        &self.message_agent
    }

    fn event_agent(&self) -> &EventAgent {
        &self.event_agent
    }
}

impl Client {
    pub(crate) async fn connect<U: Upgrade>(
        hub: Hub,
        id: String,
        upgrade: U,
    ) -> TidingsResult<Self> {
        let message_agent = MessageAgent::connect(hub.clone(), upgrade).await?;
        let event_agent = EventAgent::new(hub.clone());
        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
            let delegate: Weak<dyn Delegate> = weak.clone();
            message_agent.set_delegate_weak(delegate.clone());
            event_agent.set_delegate_weak(delegate);
            ClientInner {
                id,
                hub,
                message_agent,
                event_agent,
            }
        });
        debug!(client = %inner.id, hub = inner.hub.id(), "client connected");
        Ok(Self { inner })
    }

    /// This client's id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The hub this client belongs to.
    pub fn hub(&self) -> &Hub {
        &self.inner.hub
    }

    /// The client as a family member.
    pub fn as_delegate(&self) -> Arc<dyn Delegate> {
        self.inner.clone()
    }

    /// State of the underlying connection.
    pub fn state(&self) -> ConnectionState {
        self.inner.message_agent.state()
    }

    /// Broadcasts an event of `kind` on the client's hub, with this client as the source.
    pub async fn trigger<D: EventData>(&self, kind: &str, data: D) {
        self.inner
            .hub
            .broadcast(kind, data, Some(self.as_delegate()))
            .await;
    }

    /// Queues a frame on this client's connection.
    ///
    /// # Errors
    ///
    /// See [`MessageAgent::push_message`].
    pub async fn push_message(
        &self,
        payload: impl Into<Bytes>,
        message_type: MessageType,
    ) -> TidingsResult<()> {
        self.inner.message_agent.push_message(payload, message_type).await
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// See [`MessageAgent::push_message`].
    pub async fn push_text(&self, text: impl Into<Bytes>) -> TidingsResult<()> {
        self.inner.message_agent.push_text(text).await
    }

    /// Queues a binary frame.
    ///
    /// # Errors
    ///
    /// See [`MessageAgent::push_message`].
    pub async fn push_binary(&self, data: impl Into<Bytes>) -> TidingsResult<()> {
        self.inner.message_agent.push_binary(data).await
    }

    /// Joins every family in `families`.
    ///
    /// # Errors
    ///
    /// [`HubMismatch`](crate::common::TidingsError::HubMismatch) if any family belongs to another hub. The
    /// families of this client's hub are joined regardless.
    ///
    /// # Panics
    ///
    /// When the event dispatch task has to be started outside a Tokio runtime.
    pub fn join(&self, families: &[&Family]) -> TidingsResult<()> {
        let mut result = Ok(());
        for family in families {
            if let Err(error) = family.add(self.as_delegate()) {
                result = Err(error);
            }
        }
        result
    }

    /// Leaves `family`. Leaving a family the client is not in reports a
    /// [`NoDelegates`](crate::common::TidingsError::NoDelegates) warning.
    pub fn leave(&self, family: &Family) {
        family.remove(self.inner.as_ref());
    }

    /// `true` if the client is a member of `family`.
    pub fn belongs_to(&self, family: &Family) -> bool {
        family.has_member(self.inner.as_ref())
    }

    /// Registers an event handler on this client's event agent.
    ///
    /// # Panics
    ///
    /// When the event dispatch task has to be started outside a Tokio runtime.
    pub fn on_event(&self, kind: &str, handler: EventHandler) {
        self.inner.event_agent.subscribe(kind, handler);
    }

    /// Removes an event handler from this client's event agent.
    pub fn off_event(&self, kind: &str, handler: &EventHandler) {
        self.inner.event_agent.unsubscribe(kind, handler);
    }

    /// Registers a message handler on this client's message agent.
    pub fn on_message(&self, kind: &str, handler: MessageHandler) {
        self.inner.message_agent.subscribe(kind, handler);
    }

    /// Removes a message handler from this client's message agent.
    pub fn off_message(&self, kind: &str, handler: &MessageHandler) {
        self.inner.message_agent.unsubscribe(kind, handler);
    }

    /// Drops every message handler registered on this client for `kind`.
    ///
    /// Family handlers are kept; see [`MessageAgent::stop_listening`](crate::agent::MessageAgent::stop_listening).
    pub fn stop_listening(&self, kind: &str) {
        self.inner.message_agent.stop_listening(kind);
    }

    /// Replaces the parser used for this client's inbound frames.
    pub fn set_parser(&self, parser: Arc<dyn MessageParser>) {
        self.inner.message_agent.set_parser(parser);
    }
}

impl Delegate for Client {
    fn delegate_id(&self) -> &str {
        &self.inner.id
    }

    fn message_agent(&self) -> &MessageAgent {
        &self.inner.message_agent
    }

    fn event_agent(&self) -> &EventAgent {
        &self.inner.event_agent
    }
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Client {}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.inner.id)
            .field("hub", &self.inner.hub.id())
            .field("message_agent", &self.inner.message_agent.id())
            .field("event_agent", &self.inner.event_agent.id())
            .finish()
    }
}
