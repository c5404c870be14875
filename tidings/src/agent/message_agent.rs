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
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::common::subscriptions::{Registration, Subscriptions};
use crate::common::{AgentId, Diagnostics, HandlerId, Hub, TidingsError, TidingsResult};
use crate::message::{JsonParser, Message, MessageHandler, MessageParser, Recipient};
use crate::traits::Delegate;
use crate::transport::{Connection, MessageType, Upgrade};

mod pipeline;

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// The upgrade is in progress.
    Connecting = 0,
    /// Frames flow in both directions.
    Open = 1,
    /// Teardown has begun; pushes are refused.
    Closing = 2,
    /// The transport is closed.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// State shared by the agent and both connection tasks.
#[derive(Debug)]
pub(crate) struct ConnectionStatus {
    state: AtomicU8,
    shutdown: CancellationToken,
}

impl ConnectionStatus {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            shutdown: CancellationToken::new(),
        }
    }

    fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves to `Closing` and wakes both tasks. Only the first call has an effect.
    fn begin_close(&self) -> bool {
        let closing = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < ConnectionState::Closing as u8)
                    .then_some(ConnectionState::Closing as u8)
            })
            .is_ok();
        self.shutdown.cancel();
        closing
    }
}

/// Owns one connection and dispatches its inbound messages by kind.
///
/// A read task parses every inbound data frame with the installed
/// [`MessageParser`] and runs the handlers registered for the resulting kind. A
/// write task drains the text and binary outbound queues and sends keepalive
/// pings. Either task tearing down closes the whole connection.
///
/// Cloning a `MessageAgent` yields another handle to the same connection.
#[derive(Clone)]
pub struct MessageAgent {
    inner: Arc<Inner>,
}

struct Inner {
    id: AgentId,
    hub: Hub,
    delegate: RwLock<Option<Weak<dyn Delegate>>>,
    parser: RwLock<Arc<dyn MessageParser>>,
    subscriptions: Mutex<Subscriptions<Message>>,
    text: mpsc::Sender<Bytes>,
    binary: mpsc::Sender<Bytes>,
    status: Arc<ConnectionStatus>,
}

impl MessageAgent {
    /// Upgrades the connection and starts its read and write tasks.
    ///
    /// # Errors
    ///
    /// [`TidingsError::HandshakeTimeout`] when the upgrade outlives the handshake
    /// timeout, or whatever the upgrade itself reports. No task is started on failure.
    pub(crate) async fn connect<U: Upgrade>(hub: Hub, upgrade: U) -> TidingsResult<Self> {
        let settings = hub.connection_settings();
        let status = Arc::new(ConnectionStatus::new());
        let handshake = upgrade.upgrade(&settings);
        let connection = tokio::time::timeout(settings.handshake_timeout, handshake)
            .await
            .map_err(|_| TidingsError::HandshakeTimeout)??;
        let (source, sink) = connection.split();
        let (text, text_queue) = mpsc::channel(settings.queue_capacity);
        let (binary, binary_queue) = mpsc::channel(settings.queue_capacity);

        let agent = Self {
            inner: Arc::new(Inner {
                id: AgentId::next(),
                hub,
                delegate: RwLock::new(None),
                parser: RwLock::new(Arc::new(JsonParser)),
                subscriptions: Mutex::new(Subscriptions::default()),
                text,
                binary,
                status: status.clone(),
            }),
        };
        status.set(ConnectionState::Open);
        debug!(agent = %agent.id(), hub = agent.hub().id(), "connection open");

        pipeline::spawn(
            agent.clone(),
            source,
            sink,
            pipeline::Outbound {
                text: text_queue,
                binary: binary_queue,
            },
            settings,
        );
        Ok(agent)
    }

    /// This agent's identity.
    pub fn id(&self) -> AgentId {
        self.inner.id
    }

    /// The hub this agent belongs to.
    pub fn hub(&self) -> &Hub {
        &self.inner.hub
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.status.get()
    }

    /// `true` while the connection is open.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Replaces the parser used for inbound frames.
    pub fn set_parser(&self, parser: Arc<dyn MessageParser>) {
        *self.inner.parser.write() = parser;
    }

    /// Reports `delegate` as the recipient of every message from now on.
    pub fn set_delegate(&self, delegate: &Arc<dyn Delegate>) {
        self.set_delegate_weak(Arc::downgrade(delegate));
    }

    pub(crate) fn set_delegate_weak(&self, delegate: Weak<dyn Delegate>) {
        *self.inner.delegate.write() = Some(delegate);
    }

    /// The delegate, if one is set and still alive.
    pub fn delegate(&self) -> Option<Arc<dyn Delegate>> {
        self.inner.delegate.read().as_ref().and_then(Weak::upgrade)
    }

    fn recipient(&self) -> Recipient {
        match self.delegate() {
            Some(delegate) => Recipient::Delegate(delegate),
            None => Recipient::MessageAgent(self.clone()),
        }
    }

    /// Registers `handler` for inbound messages of `kind`.
    ///
    /// A second registration of the same handler reports a
    /// [`TidingsError::DuplicateHandler`] warning and changes nothing.
    pub fn subscribe(&self, kind: &str, handler: MessageHandler) {
        let registration = self.inner.subscriptions.lock().subscribe(kind, handler);
        if registration == Registration::Duplicate {
            self.diagnostics().warn(TidingsError::DuplicateHandler);
        }
    }

    /// Removes `handler` from `kind`. Unknown handlers are ignored.
    pub fn unsubscribe(&self, kind: &str, handler: &MessageHandler) {
        self.inner.subscriptions.lock().unsubscribe(kind, handler.id());
    }

    /// Drops every handler registered directly for `kind`.
    ///
    /// Handlers granted by the families of this agent's delegate stay until
    /// the delegate leaves those families.
    pub fn stop_listening(&self, kind: &str) {
        let removal = self.inner.subscriptions.lock().clear_direct(kind);
        trace!(agent = %self.id(), kind, ?removal, "stopped listening");
    }

    pub(crate) fn hold(&self, kind: &str, handler: MessageHandler) {
        self.inner.subscriptions.lock().hold(kind, handler);
    }

    pub(crate) fn release(&self, kind: &str, id: HandlerId) {
        self.inner.subscriptions.lock().release(kind, id);
    }

    /// `true` if `handler` is registered for `kind`.
    pub fn is_subscribed(&self, kind: &str, handler: &MessageHandler) -> bool {
        self.inner.subscriptions.lock().contains(kind, handler.id())
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.inner.subscriptions.lock().handler_count(kind)
    }

    /// Every kind with at least one handler, sorted.
    pub fn kinds(&self) -> Vec<String> {
        self.inner.subscriptions.lock().kinds()
    }

    /// Queues `payload` for sending as a frame of `message_type`.
    ///
    /// Waits while the outbound queue is full.
    ///
    /// # Errors
    ///
    /// [`TidingsError::BadMessageType`] for anything but text and binary,
    /// [`TidingsError::ConnectionClosed`] once the connection is no longer open.
    pub async fn push_message(
        &self,
        payload: impl Into<Bytes>,
        message_type: MessageType,
    ) -> TidingsResult<()> {
        let queue = match message_type {
            MessageType::Text => &self.inner.text,
            MessageType::Binary => &self.inner.binary,
            other => return Err(TidingsError::BadMessageType(other.into())),
        };
        if !self.is_open() {
            return Err(TidingsError::ConnectionClosed);
        }
        queue.send(payload.into()).await?;
        Ok(())
    }

    /// Like [`push_message`](Self::push_message), with the frame type given as a raw opcode.
    ///
    /// # Errors
    ///
    /// [`TidingsError::BadMessageType`] for unknown or non-data opcodes, plus
    /// whatever [`push_message`](Self::push_message) reports.
    pub async fn push_with_opcode(
        &self,
        payload: impl Into<Bytes>,
        opcode: u8,
    ) -> TidingsResult<()> {
        let message_type = MessageType::try_from(opcode)?;
        self.push_message(payload, message_type).await
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// See [`push_message`](Self::push_message).
    pub async fn push_text(&self, text: impl Into<Bytes>) -> TidingsResult<()> {
        self.push_message(text, MessageType::Text).await
    }

    /// Queues a binary frame.
    ///
    /// # Errors
    ///
    /// See [`push_message`](Self::push_message).
    pub async fn push_binary(&self, data: impl Into<Bytes>) -> TidingsResult<()> {
        self.push_message(data, MessageType::Binary).await
    }

    fn diagnostics(&self) -> &Diagnostics {
        self.inner.hub.diagnostics()
    }

    fn status(&self) -> Arc<ConnectionStatus> {
        self.inner.status.clone()
    }

    /// Parses one inbound data frame and runs the handlers for its kind.
    async fn receive(&self, message_type: MessageType, raw: Bytes) {
        let parser = self.inner.parser.read().clone();
        let parsed = match message_type {
            MessageType::Binary => parser.parse_binary(raw),
            _ => parser.parse_text(raw),
        };
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(error) => {
                self.diagnostics().warn(error);
                return;
            }
        };

        let handlers = self.inner.subscriptions.lock().handlers(&parsed.kind);
        if handlers.is_empty() {
            self.diagnostics().warn(TidingsError::NoSubscribers(parsed.kind));
            return;
        }
        trace!(kind = %parsed.kind, handlers = handlers.len(), "dispatching message");
        let message = Message::new(parsed, self.recipient(), self.clone());
        for handler in handlers {
            handler.call(message.clone()).await;
        }
    }
}

impl PartialEq for MessageAgent {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MessageAgent {}

impl fmt::Debug for MessageAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageAgent")
            .field("id", &self.inner.id)
            .field("hub", &self.inner.hub.id())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_close_runs_once() {
        let status = ConnectionStatus::new();
        status.set(ConnectionState::Open);
        assert!(status.begin_close());
        assert!(!status.begin_close());
        assert_eq!(status.get(), ConnectionState::Closing);
        assert!(status.shutdown.is_cancelled());
    }

    #[test]
    fn begin_close_does_not_reopen_a_closed_connection() {
        let status = ConnectionStatus::new();
        status.set(ConnectionState::Closed);
        assert!(!status.begin_close());
        assert_eq!(status.get(), ConnectionState::Closed);
    }
}
